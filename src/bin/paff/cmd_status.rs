use anyhow::{Context, Result};
use serde_json::json;
use std::path::PathBuf;

use paff::metrics::metrics_snapshot;
use paff::Container;

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let c = Container::open(&path).with_context(|| format!("open {}", path.display()))?;
    let meta = c.metadata();
    let file_len = std::fs::metadata(&path)?.len();
    let padding = meta.payload_start.saturating_sub(meta.encoded_len()? as u64);

    if json {
        let ms = metrics_snapshot();
        let v = json!({
            "path": path.display().to_string(),
            "version": &meta.version,
            "mode": &meta.mode,
            "partitions": meta.count(),
            "payload_start": meta.payload_start,
            "payload_end": meta.payload_end(),
            "metadata_padding": padding,
            "file_len": file_len,
            "range_insert": c.range_insert_name(),
            "entries": &meta.entries,
            "in_place_ratio": ms.in_place_ratio(),
            "metrics": ms,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }

    println!("PAFF status at {}", path.display());
    println!("  version:        {}", meta.version);
    println!("  mode:           {}", meta.mode);
    println!("  partitions:     {}", meta.count());
    println!("  payload_start:  {} (padding {} B)", meta.payload_start, padding);
    println!("  payload_end:    {}", meta.payload_end());
    println!("  file size:      {} B", file_len);
    println!("  range insert:   {}", c.range_insert_name());
    for (i, e) in meta.entries.iter().enumerate() {
        println!(
            "  [{:>4}] offset={} size={} sha256={}",
            i, e.offset, e.size, e.checksum
        );
    }
    Ok(())
}
