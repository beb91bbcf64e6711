//! range - capability "вставить диапазон байт и сдвинуть хвост файла".
//!
//! Назначение:
//! - Mutator не вызывает syscall напрямую, а получает реализацию RangeInsert.
//! - FallocateInsert: Linux fallocate(FALLOC_FL_INSERT_RANGE). Требует поддержки
//!   ФС (ext4, xfs) и выравнивания offset/len по размеру блока; offset < длины файла.
//! - NoRangeInsert: всегда "не поддерживается" - детерминированно включает fallback
//!   (полную перезапись), удобно для тестов и для ФС без extent-операций.
//!
//! Ошибки:
//! - PaffError::UnsupportedRangeInsert - операция недоступна/невыровнена; файл НЕ изменён.
//! - PaffError::Io - настоящая ошибка ввода-вывода.

use std::fs::File;

use crate::consts::DEFAULT_BLOCK_SIZE;
use crate::error::{PaffError, Result};
use crate::util::{block_size_of, is_aligned};

pub trait RangeInsert: Send + Sync {
    /// Open a zero-filled gap of `len` bytes at `offset`, shifting all following bytes
    /// forward. Must leave the file untouched when returning `UnsupportedRangeInsert`.
    fn insert_range(&self, file: &File, offset: u64, len: u64) -> Result<()>;

    /// Granularity required for both offset and length; None when the primitive is
    /// known to be unavailable.
    fn alignment(&self, file: &File) -> Option<u64>;

    fn name(&self) -> &'static str;
}

/// Linux `fallocate(FALLOC_FL_INSERT_RANGE)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallocateInsert;

impl FallocateInsert {
    fn precheck(file: &File, offset: u64, len: u64, block: u64) -> Result<()> {
        if len == 0 {
            return Err(PaffError::unsupported(offset, len, "zero-length range"));
        }
        if !is_aligned(offset, block) || !is_aligned(len, block) {
            return Err(PaffError::unsupported(
                offset,
                len,
                format!("not aligned to block size {}", block),
            ));
        }
        let file_len = file.metadata()?.len();
        if offset >= file_len {
            return Err(PaffError::unsupported(
                offset,
                len,
                format!("offset at or past end of file ({})", file_len),
            ));
        }
        if offset.checked_add(len).map_or(true, |v| v > i64::MAX as u64)
            || file_len.checked_add(len).map_or(true, |v| v > i64::MAX as u64)
        {
            return Err(PaffError::unsupported(offset, len, "range exceeds off_t"));
        }
        Ok(())
    }
}

impl RangeInsert for FallocateInsert {
    #[cfg(target_os = "linux")]
    fn insert_range(&self, file: &File, offset: u64, len: u64) -> Result<()> {
        use std::os::unix::io::AsRawFd;

        let block = self.alignment(file).unwrap_or(DEFAULT_BLOCK_SIZE);
        Self::precheck(file, offset, len, block)?;

        // SAFETY: fd принадлежит живому File; аргументы проверены на диапазон off_t.
        let rc = unsafe {
            libc::fallocate(
                file.as_raw_fd(),
                libc::FALLOC_FL_INSERT_RANGE,
                offset as libc::off_t,
                len as libc::off_t,
            )
        };
        if rc == 0 {
            return Ok(());
        }

        let e = std::io::Error::last_os_error();
        match e.raw_os_error() {
            Some(libc::EOPNOTSUPP) | Some(libc::EINVAL) | Some(libc::ENOSYS)
            | Some(libc::ENODEV) => Err(PaffError::unsupported(offset, len, e.to_string())),
            _ => Err(PaffError::Io(e)),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn insert_range(&self, _file: &File, offset: u64, len: u64) -> Result<()> {
        Err(PaffError::unsupported(
            offset,
            len,
            "FALLOC_FL_INSERT_RANGE is Linux-only",
        ))
    }

    fn alignment(&self, file: &File) -> Option<u64> {
        if cfg!(target_os = "linux") {
            Some(block_size_of(file).unwrap_or(DEFAULT_BLOCK_SIZE))
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        "fallocate"
    }
}

/// Always reports the primitive as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRangeInsert;

impl RangeInsert for NoRangeInsert {
    fn insert_range(&self, _file: &File, offset: u64, len: u64) -> Result<()> {
        Err(PaffError::unsupported(offset, len, "range insert disabled"))
    }

    fn alignment(&self, _file: &File) -> Option<u64> {
        None
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Capability picked from configuration (`range_insert = false` forces the rewrite path).
pub fn default_range_insert(enabled: bool) -> Box<dyn RangeInsert> {
    if enabled && cfg!(target_os = "linux") {
        Box::new(FallocateInsert)
    } else {
        Box::new(NoRangeInsert)
    }
}
