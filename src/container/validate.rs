//! container/validate - проверка контейнера без модификаций.
//!
//! Структура (фатально, Err(Format)):
//! - header/directory декодируются заново с диска (не из кеша хэндла);
//! - version/mode совпадают с конфигом;
//! - parts == число триплетов (это проверяет decode_directory);
//! - партиции не перекрываются и лежат внутри файла.
//!
//! Содержимое (собираем все):
//! - SHA-256 каждой партиции против directory -> PartitionFailure.

use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;

use crate::checksum::checksum;
use crate::codec::Metadata;
use crate::error::{PaffError, Result};
use crate::metrics::record_validation;
use crate::util::read_exact_at;

use super::core::{check_tags_match, reader_lock, Container};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionFailure {
    pub index: usize,
    pub expected: String,
    pub actual: String,
}

impl From<PartitionFailure> for PaffError {
    fn from(f: PartitionFailure) -> Self {
        PaffError::Checksum {
            index: f.index,
            expected: f.expected,
            actual: f.actual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub version: String,
    pub mode: String,
    pub count: usize,
    pub payload_start: u64,
    pub file_len: u64,
    /// Partitions whose checksum was computed.
    pub checked: usize,
    /// Mismatches in index order.
    pub failures: Vec<PartitionFailure>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_error(&self) -> Option<PaffError> {
        self.failures.first().cloned().map(PaffError::from)
    }

    pub fn into_result(self) -> Result<Self> {
        match self.first_error() {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

struct Snapshot {
    file: File,
    meta: Metadata,
    file_len: u64,
}

impl Container {
    /// Full sweep; every checksum mismatch ends up in the report.
    pub fn validate(&self) -> Result<ValidationReport> {
        self.validate_inner(false)
    }

    /// Stops at the first checksum mismatch.
    pub fn validate_fail_fast(&self) -> Result<ValidationReport> {
        self.validate_inner(true)
    }

    fn validate_inner(&self, fail_fast: bool) -> Result<ValidationReport> {
        let _g = reader_lock(&self.path)?;
        let snap = self.structure()?;
        let meta = &snap.meta;

        let (checked, failures) = if fail_fast {
            let mut checked = 0usize;
            let mut failures = Vec::new();
            for i in 0..meta.count() {
                checked += 1;
                if let Some(f) = check_one(&snap, i)? {
                    failures.push(f);
                    break;
                }
            }
            (checked, failures)
        } else {
            let results: Vec<Result<Option<PartitionFailure>>> = (0..meta.count())
                .into_par_iter()
                .map(|i| check_one(&snap, i))
                .collect();
            let mut failures = Vec::new();
            for r in results {
                if let Some(f) = r? {
                    failures.push(f);
                }
            }
            (meta.count(), failures)
        };

        for f in &failures {
            warn!(
                "{}: partition {} checksum mismatch (expected {}, got {})",
                self.path.display(),
                f.index,
                f.expected,
                f.actual
            );
        }
        record_validation(failures.len() as u64);
        debug!(
            "validated {}: {} checked, {} failure(s)",
            self.path.display(),
            checked,
            failures.len()
        );

        Ok(ValidationReport {
            version: meta.version.clone(),
            mode: meta.mode.clone(),
            count: meta.count(),
            payload_start: meta.payload_start,
            file_len: snap.file_len,
            checked,
            failures,
        })
    }

    fn structure(&self) -> Result<Snapshot> {
        let file = File::open(&self.path).map_err(|e| PaffError::from_open(&self.path, e))?;
        let file_len = file.metadata()?.len();
        let meta = Metadata::read_from(&mut BufReader::new(&file))?;

        check_tags_match(&meta, &self.cfg)?;
        meta.check_layout()?;

        let end = meta
            .payload_start
            .checked_add(meta.payload_end())
            .ok_or_else(|| PaffError::format("payload end overflows"))?;
        if end > file_len {
            return Err(PaffError::format(format!(
                "payload ends at byte {} but file is {} bytes",
                end, file_len
            )));
        }
        Ok(Snapshot {
            file,
            meta,
            file_len,
        })
    }
}

fn check_one(snap: &Snapshot, index: usize) -> Result<Option<PartitionFailure>> {
    let e = &snap.meta.entries[index];
    let size = usize::try_from(e.size)
        .map_err(|_| PaffError::format(format!("partition {} too large: {} B", index, e.size)))?;
    let mut buf = vec![0u8; size];
    read_exact_at(&snap.file, snap.meta.absolute(e)?, &mut buf)?;

    let actual = checksum(&buf);
    if actual == e.checksum {
        Ok(None)
    } else {
        Ok(Some(PartitionFailure {
            index,
            expected: e.checksum.clone(),
            actual,
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PaffConfig;
    use crate::container::write::write_with_config;
    use crate::range::NoRangeInsert;
    use std::os::unix::fs::FileExt;

    fn fixture(prefix: &str) -> Container {
        let dir = std::env::temp_dir().join(format!(
            "paff-validate-{}-{}-{}",
            prefix,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let p = dir.join("c.paff");
        let cfg = PaffConfig::default().with_fsync(false);
        write_with_config(&p, &[b"AAAA", b"BBBB", b"CCCC", b"DDDD"], &cfg).unwrap();
        Container::open_with(&p, cfg, Box::new(NoRangeInsert)).unwrap()
    }

    fn flip(c: &Container, index: usize) {
        let entries = c.entries();
        let e = &entries[index];
        let pos = c.payload_start() + e.offset;
        let f = std::fs::OpenOptions::new().write(true).open(c.path()).unwrap();
        f.write_all_at(b"z", pos).unwrap();
    }

    #[test]
    fn reports_all_mismatches() {
        let c = fixture("all");
        flip(&c, 1);
        flip(&c, 3);
        let r = c.validate().unwrap();
        assert_eq!(r.checked, 4);
        let bad: Vec<usize> = r.failures.iter().map(|f| f.index).collect();
        assert_eq!(bad, vec![1, 3]);
        assert!(matches!(r.first_error(), Some(PaffError::Checksum { index: 1, .. })));

        let ff = c.validate_fail_fast().unwrap();
        assert_eq!(ff.checked, 2);
        assert_eq!(ff.failures.len(), 1);
        assert!(matches!(ff.into_result(), Err(PaffError::Checksum { index: 1, .. })));
    }

    #[test]
    fn clean_report_serializes() {
        let c = fixture("clean");
        let r = c.validate().unwrap();
        assert!(r.is_ok());
        let js = serde_json::to_value(&r).unwrap();
        assert_eq!(js["count"], 4);
        assert!(js["failures"].as_array().unwrap().is_empty());
    }

    #[test]
    fn mode_mismatch_is_format() {
        let c = fixture("mode");
        let c2 = Container::open_with(
            c.path(),
            PaffConfig::default().with_mode("2").with_strict_tags(false),
            Box::new(NoRangeInsert),
        )
        .unwrap();
        assert!(matches!(c2.validate(), Err(PaffError::Format(_))));
    }
}
