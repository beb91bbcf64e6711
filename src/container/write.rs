//! container/write - полная запись контейнера: tmp + fsync + rename + fsync(dir).

use log::{info, warn};
use std::io::Write;
use std::path::Path;

use crate::atomic::replace_atomic;
use crate::codec::{DirEntry, Metadata};
use crate::config::PaffConfig;
use crate::error::Result;
use crate::journal::{journal_path, recover, remove_journal};
use crate::lock::acquire_exclusive_lock;
use crate::metrics::record_container_written;
use crate::range::default_range_insert;

use super::core::Container;

/// Write `partitions` as a fresh container at `path`, replacing any existing file.
pub fn write<P: AsRef<[u8]>>(
    path: impl AsRef<Path>,
    partitions: &[P],
    version: &str,
    mode: &str,
) -> Result<u64> {
    let cfg = PaffConfig::from_env().with_version(version).with_mode(mode);
    write_with_config(path, partitions, &cfg)
}

/// Same as [`write`], tags and durability taken from `cfg`. Returns bytes written.
pub fn write_with_config<P: AsRef<[u8]>>(
    path: impl AsRef<Path>,
    partitions: &[P],
    cfg: &PaffConfig,
) -> Result<u64> {
    let path = path.as_ref();
    let _x = acquire_exclusive_lock(path)?;

    // журнал старого файла не должен пережить замену
    if journal_path(path).exists() {
        let ri = default_range_insert(cfg.range_insert);
        if let Err(e) = recover(path, ri.as_ref(), cfg.fsync) {
            warn!("dropping journal of {} before overwrite: {}", path.display(), e);
            remove_journal(path)?;
        }
    }

    let mut meta = Metadata::new(&cfg.version, &cfg.mode, DirEntry::packed(partitions))?;
    let header = if cfg.meta_slack > 0 {
        let target = meta.payload_start as usize + cfg.meta_slack;
        meta.payload_start = target as u64;
        meta.encode_padded(target)?
    } else {
        meta.encode()?
    };

    let written = replace_atomic(path, cfg.fsync, |w| {
        w.write_all(&header)?;
        for p in partitions {
            w.write_all(p.as_ref())?;
        }
        Ok(())
    })?;

    record_container_written(written);
    info!(
        "wrote {}: {} partition(s), {} B (payload_start={})",
        path.display(),
        meta.count(),
        written,
        meta.payload_start
    );
    Ok(written)
}

impl Container {
    /// Write a fresh container and open it.
    pub fn create<P: AsRef<[u8]>>(
        path: impl AsRef<Path>,
        partitions: &[P],
        cfg: PaffConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        write_with_config(path, partitions, &cfg)?;
        Self::open_with_config(path, cfg)
    }
}
