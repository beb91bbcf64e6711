// Общие фейковые range-insert capability для интеграционных тестов.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use paff::{PaffError, RangeInsert};

/// Emulates FALLOC_FL_INSERT_RANGE by rewriting the tail; 4 KiB blocks.
#[allow(unused)]
pub struct ShiftTail;

impl RangeInsert for ShiftTail {
    fn insert_range(&self, file: &File, offset: u64, len: u64) -> paff::Result<()> {
        let flen = file.metadata()?.len();
        if offset % 4096 != 0 || len % 4096 != 0 || offset >= flen {
            return Err(PaffError::UnsupportedRangeInsert {
                offset,
                len,
                reason: "misaligned".into(),
            });
        }
        let mut f = file;
        let mut tail = Vec::with_capacity((flen - offset) as usize);
        f.seek(SeekFrom::Start(offset))?;
        f.read_to_end(&mut tail)?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(&vec![0u8; len as usize])?;
        f.write_all(&tail)?;
        Ok(())
    }

    fn alignment(&self, _file: &File) -> Option<u64> {
        Some(4096)
    }

    fn name(&self) -> &'static str {
        "shift-tail"
    }
}

/// Payload gaps only; refuses to grow the metadata region.
#[allow(unused)]
pub struct NoMetaGap;

impl RangeInsert for NoMetaGap {
    fn insert_range(&self, file: &File, offset: u64, len: u64) -> paff::Result<()> {
        if offset == 0 {
            return Err(PaffError::UnsupportedRangeInsert {
                offset,
                len,
                reason: "no metadata gap".into(),
            });
        }
        ShiftTail.insert_range(file, offset, len)
    }

    fn alignment(&self, _file: &File) -> Option<u64> {
        Some(4096)
    }

    fn name(&self) -> &'static str {
        "no-meta-gap"
    }
}
