//! container/open - открытие контейнера с конфигом, replay журнала, reload/close.

use log::{debug, info};
use std::path::Path;
use std::sync::RwLock;

use crate::config::PaffConfig;
use crate::error::{PaffError, Result};
use crate::journal::{journal_path, recover};
use crate::lock::acquire_exclusive_lock;
use crate::range::{default_range_insert, RangeInsert};

use super::core::{reader_lock, Container, State};

impl Container {
    /// Open with configuration taken from `PAFF_*` environment variables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PaffConfig::from_env())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: PaffConfig) -> Result<Self> {
        let range = default_range_insert(cfg.range_insert);
        Self::open_with(path, cfg, range)
    }

    /// Open with an explicit range-insert capability.
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        cfg: PaffConfig,
        range: Box<dyn RangeInsert>,
    ) -> Result<Self> {
        let path = path.as_ref();
        std::fs::metadata(path).map_err(|e| PaffError::from_open(path, e))?;

        if journal_path(path).exists() {
            let _x = acquire_exclusive_lock(path)?;
            if recover(path, range.as_ref(), cfg.fsync)? {
                info!("recovered interrupted insertion on {}", path.display());
            }
        }

        let state = {
            let _g = reader_lock(path)?;
            State::load(path, &cfg, cfg.strict_tags)?
        };
        debug!(
            "opened {} ({} partitions, range insert: {})",
            path.display(),
            state.meta.count(),
            range.name()
        );

        Ok(Self {
            path: path.to_path_buf(),
            cfg,
            range,
            state: RwLock::new(state),
        })
    }

    /// Re-read header and directory from disk.
    pub fn reload(&mut self) -> Result<()> {
        let _g = reader_lock(&self.path)?;
        let st = State::load(&self.path, &self.cfg, self.cfg.strict_tags)?;
        *self.state_mut() = st;
        Ok(())
    }

    /// Release the file descriptor. Dropping the handle does the same.
    pub fn close(self) {
        debug!("closed {}", self.path.display());
    }
}
