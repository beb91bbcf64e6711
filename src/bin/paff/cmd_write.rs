use anyhow::{anyhow, Result};
use std::path::PathBuf;

use paff::{write_with_config, PaffConfig};

use super::util::read_all;

pub fn exec(
    path: PathBuf,
    version: Option<String>,
    mode: Option<String>,
    slack: Option<usize>,
    text: Vec<String>,
    files: Vec<PathBuf>,
) -> Result<()> {
    let mut cfg = PaffConfig::from_env();
    if let Some(v) = version {
        cfg = cfg.with_version(v);
    }
    if let Some(m) = mode {
        cfg = cfg.with_mode(m);
    }
    if let Some(s) = slack {
        cfg = cfg.with_meta_slack(s);
    }

    let mut parts: Vec<Vec<u8>> = Vec::with_capacity(files.len() + text.len());
    for f in &files {
        parts.push(read_all(f)?);
    }
    parts.extend(text.into_iter().map(String::into_bytes));
    if parts.is_empty() {
        return Err(anyhow!("no partitions given (pass files and/or --text)"));
    }

    let n = write_with_config(&path, &parts, &cfg)?;
    println!(
        "OK write: {} partition(s), {} B -> {}",
        parts.len(),
        n,
        path.display()
    );
    Ok(())
}
