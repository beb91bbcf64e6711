use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use paff::Container;

use super::util::{display_text, hex_dump, to_index};

pub fn exec(path: PathBuf, index: i64, out: Option<PathBuf>) -> Result<()> {
    let c = Container::open(&path).with_context(|| format!("open {}", path.display()))?;
    let idx = to_index(&c, index)?;
    let v = c.read_partition(idx)?;

    if let Some(out_path) = out {
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)?;
        f.write_all(&v)?;
        f.sync_all()?;
        println!(
            "partition {}: {} B -> wrote to {}",
            idx,
            v.len(),
            out_path.display()
        );
    } else {
        println!("partition {}: {} B", idx, v.len());
        println!("text: {}", display_text(&v));
        println!("hex:  {}", hex_dump(&v[..v.len().min(64)]));
    }
    Ok(())
}
