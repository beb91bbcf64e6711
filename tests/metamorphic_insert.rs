// Метаморфический тест: случайная последовательность вставок (разные позиции,
// размеры, capability) против модели Vec<Vec<u8>>. После каждого шага содержимое
// контейнера обязано совпадать с моделью, а validate - проходить.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use oorandom::Rand64;

use paff::{Container, InsertStrategy, NoRangeInsert, PaffConfig};

mod common;
use common::ShiftTail;

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("paff-meta-{}-{}-{}", prefix, pid, t))
}

fn payload(step: usize, size: usize) -> Vec<u8> {
    (0..size).map(|j| ((step * 31 + j) % 251) as u8).collect()
}

fn run_seed(seed: u128) -> Result<()> {
    let mut rng = Rand64::new(seed);
    let root = unique_root(&format!("seed{}", seed));
    fs::create_dir_all(&root)?;
    let path = root.join("c.paff");

    let slack = if rng.rand_range(0..2) == 0 { 0 } else { 2048 };
    let cfg = PaffConfig::default().with_fsync(false).with_meta_slack(slack);

    // партиции по 4096 байт - чтобы часть вставок попадала на выровненные позиции
    let mut model: Vec<Vec<u8>> = (0..3).map(|i| payload(1000 + i, 4096)).collect();
    paff::write_with_config(&path, &model, &cfg)?;
    let mut c = Container::open_with(&path, cfg.clone(), Box::new(NoRangeInsert))?;

    let mut in_place = 0usize;
    for step in 0..40usize {
        let size = match rng.rand_range(0..4) {
            0 => 0,
            1 => rng.rand_range(1..64) as usize,
            2 => 4096,
            _ => rng.rand_range(1..9000) as usize,
        };
        let data = payload(step, size);
        let pick = rng.rand_range(0..(model.len() as u64 + 2)) as usize;
        let index = if step == 0 || pick > model.len() {
            None
        } else {
            Some(pick)
        };

        // первый шаг - всегда append через быстрый путь
        let out = if step == 0 || rng.rand_range(0..2) == 0 {
            c.insert_partition_with(&data, index, &ShiftTail)?
        } else {
            c.insert_partition(&data, index)?
        };
        if out.strategy != InsertStrategy::Rewrite {
            in_place += 1;
        }

        let k = index.map_or(model.len(), |i| i.min(model.len()));
        assert_eq!(out.index, k);
        model.insert(k, data);

        assert_eq!(c.len(), model.len());
        assert_eq!(c.read_partitions(None)?, model, "seed {} step {}", seed, step);

        if step % 10 == 9 {
            assert!(c.validate()?.is_ok());
            c = Container::open_with(&path, cfg.clone(), Box::new(NoRangeInsert))?;
        }
    }

    let fresh = Container::open_with(&path, cfg, Box::new(NoRangeInsert))?;
    assert_eq!(fresh.read_partitions(None)?, model);
    let report = fresh.validate()?;
    assert!(report.is_ok());
    assert_eq!(report.checked, model.len());
    assert!(in_place > 0, "seed {}: fast path never taken", seed);
    Ok(())
}

#[test]
fn random_inserts_match_model() -> Result<()> {
    for seed in [1u128, 7, 42, 2024] {
        run_seed(seed)?;
    }
    Ok(())
}
