use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use paff::{Container, NoRangeInsert, PaffConfig};

use super::util::{decode_value_arg, read_all, to_index};

pub fn exec(
    path: PathBuf,
    index: Option<i64>,
    value: Option<String>,
    value_file: Option<PathBuf>,
    no_range_insert: bool,
) -> Result<()> {
    let data = match (value, value_file) {
        (None, Some(p)) => read_all(&p)?,
        (Some(s), None) => decode_value_arg(&s)?.0,
        (Some(_), Some(_)) => return Err(anyhow!("--value and --value-file are mutually exclusive")),
        (None, None) => return Err(anyhow!("either --value or --value-file must be provided")),
    };

    let cfg = PaffConfig::from_env();
    let mut c = if no_range_insert {
        Container::open_with(&path, cfg, Box::new(NoRangeInsert))
    } else {
        Container::open_with_config(&path, cfg)
    }
    .with_context(|| format!("open {}", path.display()))?;

    let idx = index.map(|i| to_index(&c, i)).transpose()?;
    let out = c.insert_partition(&data, idx)?;
    println!(
        "OK insert: {} B at index {} ({:?}, range inserts: {}, payload gap: {} B, meta gap: {} B); now {} partition(s)",
        data.len(),
        out.index,
        out.strategy,
        out.range_inserts,
        out.payload_gap,
        out.meta_gap,
        c.len()
    );
    Ok(())
}
