// Вставка партиций: быстрый путь (фейковый range-insert, сдвигающий хвост),
// fallback (NoRangeInsert) и настоящий fallocate (любой исход допустим).

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use paff::{Container, FallocateInsert, InsertStrategy, NoRangeInsert, PaffConfig, RangeInsert};

mod common;
use common::{NoMetaGap, ShiftTail};

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("paff-ins-{}-{}-{}", prefix, pid, t))
}

fn cfg() -> PaffConfig {
    PaffConfig::default().with_fsync(false)
}

fn abcd(root: &PathBuf, ri: Box<dyn RangeInsert>) -> Result<Container> {
    fs::create_dir_all(root)?;
    let path = root.join("c.paff");
    paff::write_with_config(&path, &[b"A", b"B", b"C", b"D"], &cfg())?;
    Ok(Container::open_with(&path, cfg(), ri)?)
}

fn expect(c: &Container, want: &[&[u8]]) -> Result<()> {
    let got = c.read_partitions(None)?;
    let want: Vec<Vec<u8>> = want.iter().map(|w| w.to_vec()).collect();
    assert_eq!(got, want);
    assert!(c.validate()?.is_ok());
    Ok(())
}

#[test]
fn append_x_fallback() -> Result<()> {
    let mut c = abcd(&unique_root("append-fb"), Box::new(NoRangeInsert))?;
    let out = c.insert_partition(b"X", None)?;
    assert_eq!(out.strategy, InsertStrategy::Rewrite);
    expect(&c, &[b"A", b"B", b"C", b"D", b"X"])?;

    // свежий хэндл видит то же самое
    let again = Container::open_with(c.path(), cfg(), Box::new(NoRangeInsert))?;
    assert_eq!(again.len(), 5);
    Ok(())
}

#[test]
fn insert_at_every_position_fallback() -> Result<()> {
    for k in 0..=4usize {
        let mut c = abcd(&unique_root(&format!("pos{}", k)), Box::new(NoRangeInsert))?;
        c.insert_partition(b"new", Some(k))?;
        let base: [&[u8]; 4] = [b"A", b"B", b"C", b"D"];
        let mut want = base.to_vec();
        want.insert(k, b"new");
        expect(&c, &want)?;
    }
    Ok(())
}

#[test]
fn append_x_fast_path() -> Result<()> {
    let mut c = abcd(&unique_root("append-fast"), Box::new(ShiftTail))?;
    let out = c.insert_partition(b"X", None)?;
    assert_eq!(out.strategy, InsertStrategy::InPlace);
    assert_eq!(out.payload_gap, 0);
    assert_eq!(out.meta_gap, 4096);
    assert_eq!(out.range_inserts, 1);
    expect(&c, &[b"A", b"B", b"C", b"D", b"X"])?;
    assert!(c.validate()?.is_ok());
    assert!(!paff::journal::journal_path(c.path()).exists());
    Ok(())
}

#[test]
fn refused_metadata_gap_rewrites_metadata_only() -> Result<()> {
    let mut c = abcd(&unique_root("meta-refused"), Box::new(NoRangeInsert))?;
    let out = c.insert_partition_with(b"X", None, &NoMetaGap)?;
    assert_eq!(out.strategy, InsertStrategy::MetaRewrite);
    assert_eq!(out.range_inserts, 0);
    expect(&c, &[b"A", b"B", b"C", b"D", b"X"])?;
    assert!(c.validate()?.is_ok());
    assert!(!paff::atomic::tmp_path(c.path()).exists());
    Ok(())
}

#[test]
fn aligned_mid_insert_fast_path_keeps_gap_as_zero_hole() -> Result<()> {
    let root = unique_root("mid-fast");
    fs::create_dir_all(&root)?;
    let path = root.join("c.paff");

    // payload_start = 4096, партиции по 4096 байт -> все позиции выровнены
    let parts: Vec<Vec<u8>> = (0..4u8).map(|i| vec![b'0' + i; 4096]).collect();
    let tight = paff::Metadata::new("1.0", "1", paff::DirEntry::packed(&parts))?.payload_start;
    paff::write_with_config(&path, &parts, &cfg().with_meta_slack(4096 - tight as usize))?;

    let mut c = Container::open_with(&path, cfg(), Box::new(ShiftTail))?;
    assert_eq!(c.payload_start(), 4096);
    let before = fs::metadata(&path)?.len();

    let out = c.insert_partition(b"0123456789", Some(2))?;
    assert_eq!(out.strategy, InsertStrategy::InPlace);
    assert_eq!(out.range_inserts, 1);
    assert_eq!(out.payload_gap, 4096);
    assert_eq!(fs::metadata(&path)?.len(), before + 4096);

    let e = c.entries();
    assert_eq!(e[2].offset, 8192);
    assert_eq!(e[2].size, 10);
    assert_eq!(e[3].offset, 12288);

    let got = c.read_partitions(None)?;
    assert_eq!(got[2], b"0123456789");
    assert_eq!(got[3], parts[2]);
    assert_eq!(got[4], parts[3]);
    assert!(c.validate()?.is_ok());

    // хвост gap'а за новой партицией - нули
    let bytes = fs::read(&path)?;
    let tail = &bytes[4096 + 8192 + 10..4096 + 12288];
    assert!(tail.iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn misaligned_mid_insert_falls_back_to_rewrite() -> Result<()> {
    let mut c = abcd(&unique_root("mid-misaligned"), Box::new(ShiftTail))?;
    let out = c.insert_partition(b"Y", Some(1))?;
    assert_eq!(out.strategy, InsertStrategy::Rewrite);
    expect(&c, &[b"A", b"Y", b"B", b"C", b"D"])?;
    Ok(())
}

#[test]
fn real_fallocate_any_outcome_is_consistent() -> Result<()> {
    let root = unique_root("fallocate");
    fs::create_dir_all(&root)?;
    let path = root.join("c.paff");

    let parts: Vec<Vec<u8>> = (0..3u8).map(|i| vec![b'a' + i; 8192]).collect();
    let tight = paff::Metadata::new("1.0", "1", paff::DirEntry::packed(&parts))?.payload_start;
    paff::write_with_config(&path, &parts, &cfg().with_meta_slack(4096 - tight as usize))?;

    let mut c = Container::open_with(&path, cfg(), Box::new(FallocateInsert))?;
    c.insert_partition(b"middle", Some(1))?;
    c.insert_partition(b"end", None)?;
    c.insert_partition(b"front", Some(0))?;

    let got = c.read_partitions(None)?;
    assert_eq!(got.len(), 6);
    assert_eq!(got[0], b"front");
    assert_eq!(got[1], parts[0]);
    assert_eq!(got[2], b"middle");
    assert_eq!(got[3], parts[1]);
    assert_eq!(got[4], parts[2]);
    assert_eq!(got[5], b"end");
    assert!(c.validate()?.is_ok());
    Ok(())
}

#[test]
fn range_insert_disabled_by_config() -> Result<()> {
    let root = unique_root("disabled");
    fs::create_dir_all(&root)?;
    let path = root.join("c.paff");
    paff::write_with_config(&path, &[b"A"], &cfg())?;

    let mut c = Container::open_with_config(&path, cfg().with_range_insert(false))?;
    assert_eq!(c.range_insert_name(), "none");
    let out = c.insert_partition(b"B", None)?;
    assert_eq!(out.strategy, InsertStrategy::Rewrite);
    assert_eq!(c.read_partition(1)?, b"B");
    Ok(())
}
