//! File-based locking for single-writer / multi-reader safety.
//!
//! Cross-platform (fs2) advisory locks on a sidecar next to the container:
//! - Exclusive: write/insert; blocks readers and other writers.
//! - Shared: reads and validation.
//!
//! Lock file path: <container>.lock
//! Lock is released on Drop.

use fs2::FileExt;
use log::debug;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::util::sidecar_path;
use crate::consts::LOCK_EXT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
    mode: LockMode,
}

impl LockGuard {
    fn new(file: std::fs::File, path: PathBuf, mode: LockMode) -> Self {
        Self { file, path, mode }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn lock_file_path(container: &Path) -> PathBuf {
    sidecar_path(container, LOCK_EXT)
}

fn open_lock_file(container: &Path) -> Result<std::fs::File> {
    let path = lock_file_path(container);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)?;
    Ok(f)
}

/// Acquire a lock in the requested mode. Blocks until acquired.
pub fn acquire_lock(container: &Path, mode: LockMode) -> Result<LockGuard> {
    let file = open_lock_file(container)?;
    match mode {
        LockMode::Shared => FileExt::lock_shared(&file)?,
        LockMode::Exclusive => FileExt::lock_exclusive(&file)?,
    }
    debug!("lock {:?} acquired on {}", mode, lock_file_path(container).display());
    Ok(LockGuard::new(file, lock_file_path(container), mode))
}

/// Try to acquire a lock in the requested mode. Returns Err if already locked.
pub fn try_acquire_lock(container: &Path, mode: LockMode) -> Result<LockGuard> {
    let file = open_lock_file(container)?;
    match mode {
        LockMode::Shared => FileExt::try_lock_shared(&file)?,
        LockMode::Exclusive => FileExt::try_lock_exclusive(&file)?,
    }
    Ok(LockGuard::new(file, lock_file_path(container), mode))
}

/// Convenience wrappers.
pub fn acquire_exclusive_lock(container: &Path) -> Result<LockGuard> {
    acquire_lock(container, LockMode::Exclusive)
}

pub fn acquire_shared_lock(container: &Path) -> Result<LockGuard> {
    acquire_lock(container, LockMode::Shared)
}
