//! atomic - замена файла контейнера целиком через tmp+rename.
//!
//! Политика (как для meta в хранилище):
//! - пишем в "<path>.tmp" (truncate), flush, fsync;
//! - rename поверх "<path>";
//! - fsync родительского каталога (best‑effort на не-unix).
//! При ошибке tmp удаляется, исходный файл не тронут.

use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::consts::TMP_EXT;
use crate::error::Result;
use crate::util::{fsync_dir, sidecar_path};

pub fn tmp_path(path: &Path) -> PathBuf {
    sidecar_path(path, TMP_EXT)
}

/// Build the new content with `body` and atomically swap it in at `path`.
/// Returns the number of bytes written.
pub fn replace_atomic<F>(path: &Path, fsync: bool, body: F) -> Result<u64>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = tmp_path(path);
    let _ = fs::remove_file(&tmp); // best‑effort

    let res = (|| -> Result<u64> {
        let f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        let mut w = BufWriter::new(f);
        body(&mut w)?;
        w.flush()?;
        let f = w.into_inner().map_err(|e| e.into_error())?;
        if fsync {
            f.sync_all()?;
        }
        let written = f.metadata()?.len();
        drop(f);

        fs::rename(&tmp, path)?;
        if fsync {
            let _ = fsync_dir(path);
        }
        Ok(written)
    })();

    match res {
        Ok(n) => {
            debug!("replaced {} atomically ({} B)", path.display(), n);
            Ok(n)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(&tmp) {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!("cannot remove temp file {}: {}", tmp.display(), rm);
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaffError;

    fn unique(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "paff-atomic-{}-{}-{}",
            prefix,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn replaces_and_cleans_tmp() {
        let p = unique("ok");
        fs::write(&p, b"old").unwrap();
        let n = replace_atomic(&p, true, |w| {
            w.write_all(b"new content")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(n, 11);
        assert_eq!(fs::read(&p).unwrap(), b"new content");
        assert!(!tmp_path(&p).exists());
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn failed_body_keeps_original() {
        let p = unique("fail");
        fs::write(&p, b"old").unwrap();
        let r = replace_atomic(&p, false, |w| {
            w.write_all(b"partial")?;
            Err(PaffError::Format("boom".into()))
        });
        assert!(r.is_err());
        assert_eq!(fs::read(&p).unwrap(), b"old");
        assert!(!tmp_path(&p).exists());
        let _ = fs::remove_file(&p);
    }
}
