use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use paff::Container;

pub fn exec(path: PathBuf, json: bool, fail_fast: bool) -> Result<()> {
    let c = Container::open(&path).with_context(|| format!("open {}", path.display()))?;
    let report = if fail_fast {
        c.validate_fail_fast()?
    } else {
        c.validate()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "PAFF {} mode {}: {} partition(s), payload_start={}, file={} B, checked={}",
            report.version,
            report.mode,
            report.count,
            report.payload_start,
            report.file_len,
            report.checked
        );
        for f in &report.failures {
            println!(
                "  partition {}: checksum mismatch (expected {}, got {})",
                f.index, f.expected, f.actual
            );
        }
    }

    if report.is_ok() {
        if !json {
            println!("OK");
        }
        Ok(())
    } else {
        Err(anyhow!(
            "{} partition(s) failed checksum validation",
            report.failures.len()
        ))
    }
}
