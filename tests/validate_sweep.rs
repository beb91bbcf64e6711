use anyhow::Result;
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use paff::{Container, NoRangeInsert, PaffConfig, PaffError};

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("paff-val-{}-{}-{}", prefix, pid, t))
}

fn abcd(prefix: &str) -> Result<Container> {
    let root = unique_root(prefix);
    fs::create_dir_all(&root)?;
    let path = root.join("c.paff");
    let cfg = PaffConfig::default().with_fsync(false);
    paff::write_with_config(&path, &[b"A", b"B", b"C", b"D"], &cfg)?;
    Ok(Container::open_with(&path, cfg, Box::new(NoRangeInsert))?)
}

fn corrupt(c: &Container, index: usize) -> Result<()> {
    let entries = c.entries();
    let pos = c.payload_start() + entries[index].offset;
    let mut f = fs::OpenOptions::new().write(true).open(c.path())?;
    f.seek(SeekFrom::Start(pos))?;
    f.write_all(b"#")?;
    Ok(())
}

#[test]
fn corrupt_index_one_is_the_only_failure() -> Result<()> {
    let c = abcd("one")?;
    assert!(c.validate()?.is_ok());

    corrupt(&c, 1)?;
    let r = c.validate()?;
    assert_eq!(r.count, 4);
    assert_eq!(r.failures.len(), 1);
    let f = &r.failures[0];
    assert_eq!(f.index, 1);
    assert_eq!(f.expected, paff::checksum::checksum(b"B"));
    assert_eq!(f.actual, paff::checksum::checksum(b"#"));

    match r.into_result() {
        Err(PaffError::Checksum { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected checksum error, got {:?}", other.map(|r| r.count)),
    }
    // чтение повреждённой партиции по-прежнему возвращает байты как есть
    assert_eq!(c.read_partition(1)?, b"#");
    Ok(())
}

#[test]
fn validation_is_idempotent_and_read_only() -> Result<()> {
    let c = abcd("idem")?;
    corrupt(&c, 3)?;
    let before = fs::read(c.path())?;
    let mtime = fs::metadata(c.path())?.modified()?;

    let r1 = c.validate()?;
    let r2 = c.validate()?;
    assert_eq!(r1, r2);
    assert_eq!(fs::read(c.path())?, before);
    assert_eq!(fs::metadata(c.path())?.modified()?, mtime);
    Ok(())
}

#[test]
fn report_as_json() -> Result<()> {
    let c = abcd("json")?;
    corrupt(&c, 0)?;
    let r = c.validate()?;
    let v: serde_json::Value = serde_json::to_value(&r)?;
    assert_eq!(v["version"], "1.0");
    assert_eq!(v["mode"], "1");
    assert_eq!(v["failures"][0]["index"], 0);
    Ok(())
}

#[test]
fn padding_does_not_change_validation() -> Result<()> {
    let root = unique_root("padded");
    fs::create_dir_all(&root)?;
    let path = root.join("c.paff");
    let cfg = PaffConfig::default().with_fsync(false).with_meta_slack(300);
    paff::write_with_config(&path, &[b"x".to_vec(), vec![1, 2, 3]], &cfg)?;

    let c = Container::open_with(&path, cfg, Box::new(NoRangeInsert))?;
    let r = c.validate()?;
    assert!(r.is_ok());
    assert_eq!(r.checked, 2);
    assert_eq!(r.file_len, r.payload_start + 4);
    Ok(())
}
