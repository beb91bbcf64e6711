//! codec - текстовый header + directory контейнера PAFF (без I/O, кроме read_from).
//!
//! Формат:
//!   "PAFF <version>\n"
//!   "mode <mode>\n"
//!   "parts <n>\n"
//!   "<off0> <size0> <sum0> ... <off(n-1)> <size(n-1)> <sum(n-1)>[ padding]\n"
//!
//! Политика:
//! - offset - 0-based, относительно payload_start (первый байт после directory).
//! - payload_start = точная длина header+directory в байтах, включая '\n' и padding.
//! - padding (пробелы перед '\n' строки directory) позволяет переписывать
//!   метаданные на месте без сдвига payload; декодер его не видит.

use serde::Serialize;
use std::io::BufRead;

use crate::checksum::{checksum, is_valid_digest};
use crate::consts::{META_LINES, MODE_PREFIX, PARTS_PREFIX, VERSION_PREFIX};
use crate::error::{PaffError, Result};

/// Decoded header lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: String,
    pub mode: String,
    pub count: usize,
}

/// One directory triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub offset: u64,
    pub size: u64,
    pub checksum: String,
}

impl DirEntry {
    pub fn new(offset: u64, data: &[u8]) -> Self {
        Self {
            offset,
            size: data.len() as u64,
            checksum: checksum(data),
        }
    }

    /// Relative end offset (exclusive).
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Contiguous layout from offset 0 (fresh container).
    pub fn packed<P: AsRef<[u8]>>(partitions: &[P]) -> Vec<DirEntry> {
        let mut out = Vec::with_capacity(partitions.len());
        let mut off = 0u64;
        for p in partitions {
            let e = DirEntry::new(off, p.as_ref());
            off = e.end();
            out.push(e);
        }
        out
    }
}

/// Version/mode tags: non-empty, no whitespace (they are line payloads).
pub fn validate_tag(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PaffError::format(format!("{} tag must not be empty", kind)));
    }
    if value.chars().any(|c| c.is_whitespace()) {
        return Err(PaffError::format(format!(
            "{} tag must not contain whitespace: {:?}",
            kind, value
        )));
    }
    Ok(())
}

// ---------- Header ----------

pub fn encode_header(version: &str, mode: &str, count: usize) -> Result<Vec<u8>> {
    validate_tag("version", version)?;
    validate_tag("mode", mode)?;
    Ok(format!(
        "{}{}\n{}{}\n{}{}\n",
        VERSION_PREFIX, version, MODE_PREFIX, mode, PARTS_PREFIX, count
    )
    .into_bytes())
}

/// Decode three header lines (without their trailing newlines).
pub fn decode_header(lines: &[&str]) -> Result<Header> {
    if lines.len() != 3 {
        return Err(PaffError::format(format!(
            "header must have 3 lines, got {}",
            lines.len()
        )));
    }
    let version = lines[0]
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| PaffError::format(format!("bad version line: {:?}", lines[0])))?;
    let mode = lines[1]
        .strip_prefix(MODE_PREFIX)
        .ok_or_else(|| PaffError::format(format!("bad mode line: {:?}", lines[1])))?;
    let count_str = lines[2]
        .strip_prefix(PARTS_PREFIX)
        .ok_or_else(|| PaffError::format(format!("bad parts line: {:?}", lines[2])))?;

    // usize::from_str отвергает знак '-', так что отрицательные значения - FormatError
    let count = count_str
        .trim()
        .parse::<usize>()
        .map_err(|e| PaffError::format(format!("bad partition count {:?}: {}", count_str, e)))?;

    Ok(Header {
        version: version.to_string(),
        mode: mode.to_string(),
        count,
    })
}

// ---------- Directory ----------

pub fn encode_directory(entries: &[DirEntry]) -> Vec<u8> {
    let mut s = String::with_capacity(entries.len() * 80 + 1);
    for (i, e) in entries.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push_str(&format!("{} {} {}", e.offset, e.size, e.checksum));
    }
    s.push('\n');
    s.into_bytes()
}

/// Directory line padded with spaces (before '\n') to exactly `target_len` bytes.
pub fn encode_directory_padded(entries: &[DirEntry], target_len: usize) -> Result<Vec<u8>> {
    let mut line = encode_directory(entries);
    if line.len() > target_len {
        return Err(PaffError::format(format!(
            "directory needs {} bytes, only {} available",
            line.len(),
            target_len
        )));
    }
    line.pop();
    line.resize(target_len - 1, b' ');
    line.push(b'\n');
    Ok(line)
}

/// Decode the directory line (without its newline) for `count` partitions.
pub fn decode_directory(line: &str, count: usize) -> Result<Vec<DirEntry>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != count * 3 {
        return Err(PaffError::format(format!(
            "directory has {} tokens, expected {} for {} partitions",
            tokens.len(),
            count * 3,
            count
        )));
    }

    let mut out = Vec::with_capacity(count);
    for (i, t) in tokens.chunks_exact(3).enumerate() {
        let offset = t[0].parse::<u64>().map_err(|e| {
            PaffError::format(format!("partition {}: bad offset {:?}: {}", i, t[0], e))
        })?;
        let size = t[1].parse::<u64>().map_err(|e| {
            PaffError::format(format!("partition {}: bad size {:?}: {}", i, t[1], e))
        })?;
        if !is_valid_digest(t[2]) {
            return Err(PaffError::format(format!(
                "partition {}: bad checksum token {:?}",
                i, t[2]
            )));
        }
        out.push(DirEntry {
            offset,
            size,
            checksum: t[2].to_string(),
        });
    }
    Ok(out)
}

// ---------- Metadata (header + directory) ----------

/// Header + directory as one value, plus the on-disk footprint they occupy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub version: String,
    pub mode: String,
    pub entries: Vec<DirEntry>,
    /// Bytes occupied on disk by header+directory (padding included).
    pub payload_start: u64,
}

impl Metadata {
    /// Fresh metadata; payload_start is the minimal encoded length.
    pub fn new(version: &str, mode: &str, entries: Vec<DirEntry>) -> Result<Self> {
        let mut m = Self {
            version: version.to_string(),
            mode: mode.to_string(),
            entries,
            payload_start: 0,
        };
        m.payload_start = m.encoded_len()? as u64;
        Ok(m)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Minimal (unpadded) encoded length.
    pub fn encoded_len(&self) -> Result<usize> {
        let h = encode_header(&self.version, &self.mode, self.entries.len())?;
        Ok(h.len() + encode_directory(&self.entries).len())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = encode_header(&self.version, &self.mode, self.entries.len())?;
        out.extend_from_slice(&encode_directory(&self.entries));
        Ok(out)
    }

    /// Encode padded to exactly `target_len` bytes.
    pub fn encode_padded(&self, target_len: usize) -> Result<Vec<u8>> {
        let mut out = encode_header(&self.version, &self.mode, self.entries.len())?;
        if out.len() >= target_len {
            return Err(PaffError::format(format!(
                "metadata does not fit in {} bytes",
                target_len
            )));
        }
        let dir = encode_directory_padded(&self.entries, target_len - out.len())?;
        out.extend_from_slice(&dir);
        Ok(out)
    }

    /// Relative end of the furthest partition (0 for an empty container).
    pub fn payload_end(&self) -> u64 {
        self.entries.iter().map(|e| e.end()).max().unwrap_or(0)
    }

    /// Absolute file position of `e`.
    #[inline]
    pub fn absolute(&self, e: &DirEntry) -> Result<u64> {
        self.payload_start.checked_add(e.offset).ok_or_else(|| {
            PaffError::format(format!(
                "partition offset {} overflows past payload start {}",
                e.offset, self.payload_start
            ))
        })
    }

    /// Offsets non-decreasing, partitions non-overlapping, every absolute end fits in u64.
    pub fn check_layout(&self) -> Result<()> {
        let mut prev_end = 0u64;
        for (i, e) in self.entries.iter().enumerate() {
            let end = e
                .offset
                .checked_add(e.size)
                .and_then(|end| end.checked_add(self.payload_start).map(|_| end))
                .ok_or_else(|| {
                    PaffError::format(format!(
                        "partition {}: payload_start+offset+size overflows",
                        i
                    ))
                })?;
            if e.offset < prev_end {
                return Err(PaffError::format(format!(
                    "partition {} at offset {} overlaps previous partition ending at {}",
                    i, e.offset, prev_end
                )));
            }
            prev_end = end;
        }
        Ok(())
    }

    /// Read and decode the 4 metadata lines from the start of a container.
    pub fn read_from<R: BufRead>(r: &mut R) -> Result<Self> {
        let mut lines: Vec<String> = Vec::with_capacity(META_LINES);
        let mut consumed = 0u64;
        let mut buf = Vec::new();

        for n in 0..META_LINES {
            buf.clear();
            let got = r.read_until(b'\n', &mut buf)?;
            if got == 0 || buf.last() != Some(&b'\n') {
                return Err(PaffError::format(format!(
                    "truncated metadata: line {} is missing or unterminated",
                    n + 1
                )));
            }
            consumed += got as u64;
            buf.pop();
            let s = String::from_utf8(std::mem::take(&mut buf)).map_err(|_| {
                PaffError::format(format!("metadata line {} is not UTF-8", n + 1))
            })?;
            lines.push(s);
        }

        let header = decode_header(&[lines[0].as_str(), lines[1].as_str(), lines[2].as_str()])?;
        let entries = decode_directory(&lines[3], header.count)?;

        Ok(Self {
            version: header.version,
            mode: header.mode,
            entries,
            payload_start: consumed,
        })
    }
}
