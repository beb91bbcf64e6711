//! container/insert - вставка партиции.
//!
//! Быстрый путь (InPlace):
//! - payload: range-insert выровненного по блоку gap'а в позиции partition[k]
//!   (append - без gap'а, просто дописываем хвост);
//! - metadata: если новый header+directory не влезает в старый padding -
//!   range-insert выровненного gap'а по смещению 0; затем запись header+directory
//!   с padding до нового payload_start.
//! - всё под журналом (journal.rs), снимаем журнал после финального fsync.
//!
//! Fallback (Rewrite): capability сказала UnsupportedRangeInsert (или позиция
//! невыровнена) - пересобираем весь контейнер в "<path>.tmp" и rename.

use log::{debug, info, warn};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::atomic::replace_atomic;
use crate::codec::{DirEntry, Metadata};
use crate::config::PaffConfig;
use crate::error::{PaffError, Result};
use crate::journal::{self, Applied, InsertIntent};
use crate::lock::acquire_exclusive_lock;
use crate::metrics::record_insert;
use crate::range::RangeInsert;
use crate::util::{copy_range, fsync_dir, is_aligned, round_up};

use super::core::{Container, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsertStrategy {
    /// Payload and metadata updated in the existing file.
    InPlace,
    /// Payload updated in place; metadata growth needed a tmp+rename.
    MetaRewrite,
    /// Whole container rebuilt into a temp file and renamed.
    Rewrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    /// Index the new partition ended up at.
    pub index: usize,
    pub strategy: InsertStrategy,
    /// Successful range-insert calls.
    pub range_inserts: u32,
    /// Bytes opened in the payload region (0 for appends and rewrites).
    pub payload_gap: u64,
    /// Bytes the metadata region grew by through range insertion.
    pub meta_gap: u64,
}

enum Plan {
    InPlace(InsertIntent),
    Rewrite(&'static str),
}

impl Container {
    /// Insert `data` before partition `index`; `None` or `index >= len()` appends.
    pub fn insert_partition(&mut self, data: &[u8], index: Option<usize>) -> Result<InsertOutcome> {
        let Container {
            path,
            cfg,
            range,
            state,
        } = self;
        let st = state.get_mut().unwrap_or_else(|p| p.into_inner());
        insert_impl(path, cfg, st, range.as_ref(), data, index)
    }

    /// Same as [`Container::insert_partition`] with an explicit range-insert capability.
    pub fn insert_partition_with(
        &mut self,
        data: &[u8],
        index: Option<usize>,
        ri: &dyn RangeInsert,
    ) -> Result<InsertOutcome> {
        let path = self.path.clone();
        let cfg = self.cfg.clone();
        insert_impl(&path, &cfg, self.state_mut(), ri, data, index)
    }
}

fn insert_impl(
    path: &Path,
    cfg: &PaffConfig,
    state: &mut State,
    ri: &dyn RangeInsert,
    data: &[u8],
    index: Option<usize>,
) -> Result<InsertOutcome> {
    let _x = acquire_exclusive_lock(path)?;
    journal::recover(path, ri, cfg.fsync)?;
    *state = State::load(path, cfg, cfg.strict_tags)?;

    let count = state.meta.count();
    let k = index.map_or(count, |i| i.min(count));

    let outcome = match plan(state, cfg, ri, data, k)? {
        Plan::InPlace(intent) => match apply_in_place(path, cfg, ri, &intent)? {
            Some(applied) => {
                let (strategy, range_inserts) = match applied {
                    Applied::InPlace { range_inserts } => (InsertStrategy::InPlace, range_inserts),
                    Applied::MetaRewritten { range_inserts } => {
                        (InsertStrategy::MetaRewrite, range_inserts)
                    }
                };
                InsertOutcome {
                    index: k,
                    strategy,
                    range_inserts,
                    payload_gap: intent.data_gap,
                    meta_gap: if strategy == InsertStrategy::InPlace {
                        intent.meta_gap
                    } else {
                        0
                    },
                }
            }
            None => rewrite_all(path, cfg, state, data, k)?,
        },
        Plan::Rewrite(reason) => {
            debug!("insert into {} needs a rewrite: {}", path.display(), reason);
            rewrite_all(path, cfg, state, data, k)?
        }
    };

    *state = State::load(path, cfg, cfg.strict_tags)?;
    record_insert(
        outcome.strategy != InsertStrategy::Rewrite,
        outcome.range_inserts,
    );
    info!(
        "inserted {} B at index {} of {} ({:?}, {} range insert(s))",
        data.len(),
        outcome.index,
        path.display(),
        outcome.strategy,
        outcome.range_inserts
    );
    Ok(outcome)
}

fn plan(state: &State, cfg: &PaffConfig, ri: &dyn RangeInsert, data: &[u8], k: usize) -> Result<Plan> {
    let meta = &state.meta;
    let count = meta.count();
    let ps0 = meta.payload_start;
    let file_len = state.file.metadata()?.len();
    let d = data.len() as u64;
    let block = ri.alignment(&state.file);

    let mut entries = meta.entries.clone();
    let (offset, data_gap) = if k == count {
        (meta.payload_end(), 0)
    } else {
        let offset = entries[k].offset;
        let pos = ps0 + offset;
        let shift = if d == 0 {
            0
        } else if pos >= file_len {
            // всё, что после позиции, - пустые партиции в конце файла
            d
        } else {
            match block {
                Some(b) if is_aligned(pos, b) => round_up(d, b),
                Some(_) => return Ok(Plan::Rewrite("insert position not block-aligned")),
                None => return Ok(Plan::Rewrite("range insert unavailable")),
            }
        };
        for e in entries[k..].iter_mut() {
            e.offset += shift;
        }
        let data_gap = if pos >= file_len { 0 } else { shift };
        (offset, data_gap)
    };
    entries.insert(k, DirEntry::new(offset, data));

    let mut new_meta = Metadata {
        version: meta.version.clone(),
        mode: meta.mode.clone(),
        entries,
        payload_start: ps0,
    };
    new_meta.check_layout()?;

    let needed = new_meta.encoded_len()? as u64;
    let meta_gap = if needed <= ps0 {
        0
    } else {
        match block {
            Some(b) => round_up(needed - ps0 + cfg.meta_slack as u64, b),
            None => return Ok(Plan::Rewrite("metadata outgrew its padding")),
        }
    };
    new_meta.payload_start = ps0 + meta_gap;
    let meta_bytes = new_meta.encode_padded(new_meta.payload_start as usize)?;

    Ok(Plan::InPlace(InsertIntent {
        base_len: file_len,
        meta_base: ps0,
        data_pos: ps0 + offset,
        data_gap,
        meta_gap,
        data: data.to_vec(),
        meta: meta_bytes,
    }))
}

/// Ok(None): the payload gap could not be opened and the file is untouched.
fn apply_in_place(
    path: &Path,
    cfg: &PaffConfig,
    ri: &dyn RangeInsert,
    intent: &InsertIntent,
) -> Result<Option<Applied>> {
    journal::write_journal(path, intent, cfg.fsync)?;
    let mut f = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| PaffError::from_open(path, e))?;

    match journal::apply(path, &mut f, intent, ri, cfg.fsync) {
        Ok(applied) => {
            journal::remove_journal(path)?;
            if cfg.fsync {
                let _ = fsync_dir(path);
            }
            Ok(Some(applied))
        }
        Err(PaffError::UnsupportedRangeInsert { reason, .. }) => {
            warn!(
                "range insert on {} unavailable ({}), falling back to full rewrite",
                path.display(),
                reason
            );
            journal::remove_journal(path)?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Rebuild the container with `data` at index `k`, partitions packed from offset 0.
fn rewrite_all(
    path: &Path,
    cfg: &PaffConfig,
    state: &State,
    data: &[u8],
    k: usize,
) -> Result<InsertOutcome> {
    let old = &state.meta;

    let mut entries = Vec::with_capacity(old.count() + 1);
    let mut off = 0u64;
    for i in 0..=old.count() {
        let e = if i == k {
            DirEntry::new(off, data)
        } else {
            let src = &old.entries[if i < k { i } else { i - 1 }];
            DirEntry {
                offset: off,
                size: src.size,
                checksum: src.checksum.clone(),
            }
        };
        off = e.end();
        entries.push(e);
    }

    let mut meta = Metadata::new(&old.version, &old.mode, entries)?;
    meta.payload_start += cfg.meta_slack as u64;
    let header = meta.encode_padded(meta.payload_start as usize)?;

    replace_atomic(path, cfg.fsync, |w| {
        w.write_all(&header)?;
        for i in 0..=old.count() {
            if i == k {
                w.write_all(data)?;
            } else {
                let src = &old.entries[if i < k { i } else { i - 1 }];
                copy_range(&state.file, old.absolute(src)?, src.size, w)?;
            }
        }
        Ok(())
    })?;

    Ok(InsertOutcome {
        index: k,
        strategy: InsertStrategy::Rewrite,
        range_inserts: 0,
        payload_gap: 0,
        meta_gap: 0,
    })
}
