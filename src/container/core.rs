//! container/core - Container, его состояние и общие помощники.
//!
//! Container владеет:
//! - путём контейнера и конфигом;
//! - capability RangeInsert (инжектируется, см. range.rs);
//! - State под RwLock: открытый File (только чтение) + декодированные Metadata
//!   + FileStamp (len/mtime/inode) на момент загрузки.
//!
//! Чтения берут shared‑lock на "<path>.lock", мутации - exclusive.
//! Перед чтением сверяем FileStamp пути с сохранённым: если файл изменился
//! (вставка на месте всегда меняет длину/mtime, перезапись - inode),
//! метаданные перечитываются.

use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use crate::codec::{DirEntry, Metadata};
use crate::config::PaffConfig;
use crate::error::{PaffError, Result};
use crate::journal::journal_path;
use crate::lock::{acquire_lock, LockGuard, LockMode};
use crate::metrics::record_partition_read;
use crate::range::RangeInsert;
use crate::util::read_exact_at;

/// Identity of the on-disk bytes a State was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
    ino: u64,
}

impl FileStamp {
    fn from_meta(m: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let ino = {
            use std::os::unix::fs::MetadataExt;
            m.ino()
        };
        #[cfg(not(unix))]
        let ino = 0;
        Self {
            len: m.len(),
            modified: m.modified().ok(),
            ino,
        }
    }

    pub(crate) fn of_file(f: &File) -> Result<Self> {
        Ok(Self::from_meta(&f.metadata()?))
    }

    pub(crate) fn of_path(p: &Path) -> Result<Self> {
        let m = std::fs::metadata(p).map_err(|e| PaffError::from_open(p, e))?;
        Ok(Self::from_meta(&m))
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        self.len
    }
}

pub(crate) struct State {
    pub(crate) file: File,
    pub(crate) meta: Metadata,
    pub(crate) stamp: FileStamp,
}

impl State {
    /// Open + decode. Refuses to load while an insertion journal is pending.
    pub(crate) fn load(path: &Path, cfg: &PaffConfig, check_tags: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| PaffError::from_open(path, e))?;
        if journal_path(path).exists() {
            return Err(PaffError::format(format!(
                "interrupted insertion pending on {}; reopen the container to recover",
                path.display()
            )));
        }
        let stamp = FileStamp::of_file(&file)?;
        let meta = Metadata::read_from(&mut BufReader::new(&file))?;

        if check_tags {
            check_tags_match(&meta, cfg)?;
        }
        meta.check_layout()?;

        debug!(
            "loaded {}: {} partition(s), payload_start={}, len={}",
            path.display(),
            meta.count(),
            meta.payload_start,
            stamp.len()
        );
        Ok(Self { file, meta, stamp })
    }

    /// Positioned read of partition `index`.
    pub(crate) fn read_entry(&self, index: usize) -> Result<Vec<u8>> {
        let count = self.meta.count();
        let e = self
            .meta
            .entries
            .get(index)
            .ok_or(PaffError::Range { index, count })?;
        let size = usize::try_from(e.size)
            .map_err(|_| PaffError::format(format!("partition {} too large: {} B", index, e.size)))?;

        let pos = self.meta.absolute(e)?;
        let mut buf = vec![0u8; size];
        read_exact_at(&self.file, pos, &mut buf).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                PaffError::format(format!(
                    "partition {} truncated: needs bytes {}..{} of the file",
                    index,
                    pos,
                    pos.saturating_add(e.size)
                ))
            } else {
                PaffError::Io(err)
            }
        })?;
        record_partition_read(e.size);
        Ok(buf)
    }
}

pub(crate) fn check_tags_match(meta: &Metadata, cfg: &PaffConfig) -> Result<()> {
    if meta.version != cfg.version {
        return Err(PaffError::format(format!(
            "version mismatch: container has {:?}, expected {:?}",
            meta.version, cfg.version
        )));
    }
    if meta.mode != cfg.mode {
        return Err(PaffError::format(format!(
            "mode mismatch: container has {:?}, expected {:?}",
            meta.mode, cfg.mode
        )));
    }
    Ok(())
}

/// Shared lock for readers. A read-only location that cannot host the lock sidecar
/// is read without one.
pub(crate) fn reader_lock(path: &Path) -> Result<Option<LockGuard>> {
    match acquire_lock(path, LockMode::Shared) {
        Ok(g) => Ok(Some(g)),
        Err(PaffError::Io(e))
            if e.kind() == std::io::ErrorKind::PermissionDenied
                || e.raw_os_error() == Some(libc::EROFS) =>
        {
            debug!("no lock sidecar for {} ({}), reading unlocked", path.display(), e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Open PAFF container handle.
pub struct Container {
    pub(crate) path: PathBuf,
    pub(crate) cfg: PaffConfig,
    pub(crate) range: Box<dyn RangeInsert>,
    pub(crate) state: RwLock<State>,
}

impl Container {
    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn state_mut(&mut self) -> &mut State {
        self.state.get_mut().unwrap_or_else(|p| p.into_inner())
    }

    /// Current state, reloaded first if the file changed on disk since it was decoded.
    /// Caller must already hold the reader lock.
    pub(crate) fn fresh_state(&self) -> Result<RwLockReadGuard<'_, State>> {
        let now = FileStamp::of_path(&self.path)?;
        {
            let st = self.read_state();
            if st.stamp == now {
                return Ok(st);
            }
        }
        {
            let mut w = self.write_state();
            if w.stamp != now {
                debug!("{} changed on disk, reloading metadata", self.path.display());
                *w = State::load(&self.path, &self.cfg, self.cfg.strict_tags)?;
            }
        }
        Ok(self.read_state())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &PaffConfig {
        &self.cfg
    }

    /// Name of the injected range-insert capability.
    pub fn range_insert_name(&self) -> &'static str {
        self.range.name()
    }

    /// Partition count as of the last metadata load.
    pub fn len(&self) -> usize {
        self.read_state().meta.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> String {
        self.read_state().meta.version.clone()
    }

    pub fn mode(&self) -> String {
        self.read_state().meta.mode.clone()
    }

    pub fn payload_start(&self) -> u64 {
        self.read_state().meta.payload_start
    }

    pub fn entries(&self) -> Vec<DirEntry> {
        self.read_state().meta.entries.clone()
    }

    pub fn metadata(&self) -> Metadata {
        self.read_state().meta.clone()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.read_state();
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("version", &st.meta.version)
            .field("mode", &st.meta.mode)
            .field("partitions", &st.meta.count())
            .field("payload_start", &st.meta.payload_start)
            .field("range_insert", &self.range.name())
            .finish()
    }
}
