use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{PaffError, Result};

const COPY_CHUNK: usize = 64 * 1024;

/// `<path>.<ext>` next to the container (e.g. `data.paff.lock`).
pub fn sidecar_path(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Positioned read without touching the shared file cursor (safe from many threads).
#[cfg(unix)]
pub fn read_exact_at(f: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    f.read_exact_at(buf, offset)
}

#[cfg(windows)]
pub fn read_exact_at(f: &File, mut offset: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match f.seek_read(buf, offset) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Stream `len` bytes starting at `offset` into `w` without moving the file cursor.
pub fn copy_range<W: Write>(f: &File, offset: u64, len: u64, w: &mut W) -> Result<()> {
    let mut buf = vec![0u8; COPY_CHUNK.min(len as usize)];
    let mut done = 0u64;
    while done < len {
        let n = ((len - done) as usize).min(buf.len());
        read_exact_at(f, offset + done, &mut buf[..n]).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                PaffError::format(format!(
                    "payload truncated: bytes {}..{} are missing",
                    offset + done,
                    offset + len
                ))
            } else {
                PaffError::Io(e)
            }
        })?;
        w.write_all(&buf[..n])?;
        done += n as u64;
    }
    Ok(())
}

pub fn write_at(f: &mut File, offset: u64, buf: &[u8]) -> Result<()> {
    f.seek(SeekFrom::Start(offset))?;
    f.write_all(buf)?;
    Ok(())
}

#[cfg(unix)]
pub fn fsync_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
pub fn fsync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[inline]
pub fn round_up(v: u64, align: u64) -> u64 {
    if align == 0 {
        return v;
    }
    v.div_ceil(align) * align
}

#[inline]
pub fn is_aligned(v: u64, align: u64) -> bool {
    align != 0 && v % align == 0
}

/// Filesystem block size of an open file (st_blksize), if known.
#[cfg(unix)]
pub fn block_size_of(f: &File) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    f.metadata().ok().map(|m| m.blksize()).filter(|&b| b > 0)
}

#[cfg(not(unix))]
pub fn block_size_of(_f: &File) -> Option<u64> {
    None
}
