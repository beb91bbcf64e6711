//! journal - write-ahead запись намерения для вставки партиции "на месте".
//!
//! Назначение:
//! - Перед любым изменением файла контейнера на месте Mutator пишет и fsync'ает
//!   "<path>.journal" с полным описанием операции (новые байты партиции + новые
//!   байты header/directory, позиции и длины range-insert'ов).
//! - После финального fsync журнал удаляется.
//! - При open() живой журнал переигрывается: по длине файла определяем, какие
//!   шаги уже случились, и доделываем остальные (записи идемпотентны).
//!
//! Шаги (в этом порядке):
//!   1. data_gap > 0: insert_range(data_pos, data_gap)   - длина base_len -> base_len+data_gap
//!   2. write(data_pos, data)                            - append может удлинить файл до mid_len
//!   3. meta_gap > 0: insert_range(0, meta_gap)          - длина mid_len -> final_len
//!   4. write(0, meta)
//!
//! Рваный журнал (короткий / CRC / magic) означает, что на месте ничего не
//! менялось (журнал fsync'ается до шага 1) - его просто выбрасываем.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::atomic::replace_atomic;
use crate::consts::{
    JOURNAL_CRC_SIZE, JOURNAL_EXT, JOURNAL_HDR_SIZE, JOURNAL_MAGIC, JOURNAL_VERSION,
};
use crate::error::{PaffError, Result};
use crate::metrics::record_journal_replay;
use crate::range::RangeInsert;
use crate::util::{fsync_dir, sidecar_path, write_at};

/// Pending in-place insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertIntent {
    /// File length before any in-place step.
    pub base_len: u64,
    /// payload_start before the operation.
    pub meta_base: u64,
    /// Absolute position of the new bytes, before the metadata gap is opened.
    pub data_pos: u64,
    /// Bytes range-inserted at `data_pos` (0 for appends).
    pub data_gap: u64,
    /// Bytes range-inserted at offset 0 for metadata growth.
    pub meta_gap: u64,
    pub data: Vec<u8>,
    /// New header+directory, padded to `meta_base + meta_gap` bytes.
    pub meta: Vec<u8>,
}

/// How a journaled insertion ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Every step ran on the file in place.
    InPlace { range_inserts: u32 },
    /// Payload steps ran in place; metadata growth fell back to tmp+rename.
    MetaRewritten { range_inserts: u32 },
}

impl InsertIntent {
    /// Length after steps 1–2.
    pub fn mid_len(&self) -> u64 {
        (self.base_len + self.data_gap).max(self.data_pos + self.data.len() as u64)
    }

    /// Length after all steps.
    pub fn final_len(&self) -> u64 {
        self.mid_len() + self.meta_gap
    }

    pub fn encode(&self) -> Vec<u8> {
        let total = JOURNAL_HDR_SIZE + self.data.len() + self.meta.len() + JOURNAL_CRC_SIZE;
        let mut out = vec![0u8; JOURNAL_HDR_SIZE];
        out.reserve(total - JOURNAL_HDR_SIZE);

        out[0..8].copy_from_slice(JOURNAL_MAGIC);
        LittleEndian::write_u32(&mut out[8..12], JOURNAL_VERSION);
        let fields = [
            self.base_len,
            self.meta_base,
            self.data_pos,
            self.data_gap,
            self.meta_gap,
            self.data.len() as u64,
            self.meta.len() as u64,
        ];
        for (i, v) in fields.iter().enumerate() {
            let off = 12 + i * 8;
            LittleEndian::write_u64(&mut out[off..off + 8], *v);
        }
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.meta);

        let crc = crc32c::crc32c(&out);
        let mut tmp4 = [0u8; 4];
        LittleEndian::write_u32(&mut tmp4, crc);
        out.extend_from_slice(&tmp4);
        out
    }

    /// Ok(None) - рваная/чужая запись (выбросить); Err - неподдерживаемая версия.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < JOURNAL_HDR_SIZE + JOURNAL_CRC_SIZE {
            return Ok(None);
        }
        if &buf[0..8] != JOURNAL_MAGIC {
            return Ok(None);
        }
        let ver = LittleEndian::read_u32(&buf[8..12]);
        let mut f = [0u64; 7];
        for (i, v) in f.iter_mut().enumerate() {
            let off = 12 + i * 8;
            *v = LittleEndian::read_u64(&buf[off..off + 8]);
        }
        let (data_len, meta_len) = (f[5], f[6]);

        let body_len = (JOURNAL_HDR_SIZE as u64)
            .checked_add(data_len)
            .and_then(|v| v.checked_add(meta_len));
        let body_len = match body_len {
            Some(n) if n + JOURNAL_CRC_SIZE as u64 == buf.len() as u64 => n as usize,
            _ => return Ok(None),
        };

        let stored = LittleEndian::read_u32(&buf[body_len..body_len + 4]);
        let calc = crc32c::crc32c(&buf[..body_len]);
        if stored != calc {
            return Ok(None);
        }
        if ver != JOURNAL_VERSION {
            return Err(PaffError::format(format!(
                "unsupported journal version {} (expected {})",
                ver, JOURNAL_VERSION
            )));
        }

        let data_end = JOURNAL_HDR_SIZE + data_len as usize;
        Ok(Some(Self {
            base_len: f[0],
            meta_base: f[1],
            data_pos: f[2],
            data_gap: f[3],
            meta_gap: f[4],
            data: buf[JOURNAL_HDR_SIZE..data_end].to_vec(),
            meta: buf[data_end..body_len].to_vec(),
        }))
    }
}

pub fn journal_path(container: &Path) -> PathBuf {
    sidecar_path(container, JOURNAL_EXT)
}

/// Persist the intent before touching the container.
pub fn write_journal(container: &Path, intent: &InsertIntent, fsync: bool) -> Result<()> {
    let p = journal_path(container);
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&p)?;
    f.write_all(&intent.encode())?;
    if fsync {
        f.sync_all()?;
        let _ = fsync_dir(&p);
    }
    debug!(
        "journal written: {} (data {} B, meta {} B)",
        p.display(),
        intent.data.len(),
        intent.meta.len()
    );
    Ok(())
}

pub fn remove_journal(container: &Path) -> Result<()> {
    let p = journal_path(container);
    match fs::remove_file(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Run (or finish) the journaled steps on `file`.
///
/// `UnsupportedRangeInsert` is returned only when the payload gap could not be
/// opened, in which case the container bytes were not modified.
pub fn apply(
    path: &Path,
    file: &mut File,
    it: &InsertIntent,
    ri: &dyn RangeInsert,
    fsync: bool,
) -> Result<Applied> {
    let mut len = file.metadata()?.len();
    let mut inserts = 0u32;
    let meta_done = it.meta_gap > 0 && len == it.final_len();

    if meta_done {
        // шаг 3 уже был - перепишем данные в новых координатах
        write_at(file, it.data_pos + it.meta_gap, &it.data)?;
    } else {
        if len < it.base_len || len > it.mid_len() {
            return Err(PaffError::format(format!(
                "journal does not match container: length {} outside [{}, {}]",
                len,
                it.base_len,
                it.mid_len()
            )));
        }

        if it.data_gap > 0 {
            if len == it.base_len {
                ri.insert_range(file, it.data_pos, it.data_gap)?;
                inserts += 1;
                len += it.data_gap;
                let now = file.metadata()?.len();
                if now != len {
                    return Err(PaffError::format(format!(
                        "payload gap left container at {} B, expected {} B",
                        now, len
                    )));
                }
                debug!("payload gap opened at {} (+{} B)", it.data_pos, it.data_gap);
            } else if len != it.base_len + it.data_gap {
                return Err(PaffError::format(format!(
                    "journal does not match container: length {} after payload gap",
                    len
                )));
            }
        }

        write_at(file, it.data_pos, &it.data)?;

        if it.meta_gap > 0 {
            match ri.insert_range(file, 0, it.meta_gap) {
                Ok(()) => {
                    inserts += 1;
                    debug!("metadata gap opened (+{} B)", it.meta_gap);
                }
                Err(PaffError::UnsupportedRangeInsert { reason, .. }) => {
                    warn!(
                        "metadata range insert unavailable ({}), rewriting {}",
                        reason,
                        path.display()
                    );
                    if fsync {
                        file.sync_all()?;
                    }
                    rewrite_with_meta(path, file, it, fsync)?;
                    return Ok(Applied::MetaRewritten {
                        range_inserts: inserts,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    write_at(file, 0, &it.meta)?;
    if fsync {
        file.sync_all()?;
    }
    Ok(Applied::InPlace {
        range_inserts: inserts,
    })
}

/// New metadata followed by the (already updated) payload region, swapped in via rename.
fn rewrite_with_meta(path: &Path, file: &mut File, it: &InsertIntent, fsync: bool) -> Result<()> {
    let len = file.metadata()?.len();
    let payload_len = len.saturating_sub(it.meta_base);
    file.seek(SeekFrom::Start(it.meta_base))?;
    let src: &mut File = file;
    replace_atomic(path, fsync, |w| {
        w.write_all(&it.meta)?;
        let copied = io::copy(&mut Read::by_ref(src).take(payload_len), w)?;
        if copied != payload_len {
            return Err(PaffError::format(format!(
                "payload shrank during rewrite ({} of {} B)",
                copied, payload_len
            )));
        }
        Ok(())
    })?;
    Ok(())
}

/// Replay a pending journal, if any. Returns true when one was applied.
pub fn recover(path: &Path, ri: &dyn RangeInsert, fsync: bool) -> Result<bool> {
    let jp = journal_path(path);
    let bytes = match fs::read(&jp) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let intent = match InsertIntent::decode(&bytes)? {
        Some(it) => it,
        None => {
            warn!("discarding torn journal {}", jp.display());
            remove_journal(path)?;
            return Ok(false);
        }
    };

    let mut f = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| PaffError::from_open(path, e))?;

    match apply(path, &mut f, &intent, ri, fsync) {
        Ok(applied) => {
            info!("journal replayed on {}: {:?}", path.display(), applied);
            record_journal_replay();
            remove_journal(path)?;
            Ok(true)
        }
        Err(PaffError::UnsupportedRangeInsert { reason, .. }) => {
            // шаг 1 не случился - контейнер в исходном состоянии
            warn!(
                "journal on {} cannot be replayed ({}); container left as before",
                path.display(),
                reason
            );
            remove_journal(path)?;
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
