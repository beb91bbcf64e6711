//! Lightweight global metrics for PAFF.
//!
//! Потокобезопасные атомарные счётчики:
//! - Reads (partitions/bytes/batches)
//! - Writes (full writes)
//! - Inserts (in-place / rewrite, range-insert calls)
//! - Journal replays
//! - Validation sweeps

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Reads -----
static PARTITIONS_READ: AtomicU64 = AtomicU64::new(0);
static BYTES_READ: AtomicU64 = AtomicU64::new(0);
static BATCH_READS: AtomicU64 = AtomicU64::new(0);

// ----- Writes -----
static CONTAINERS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);

// ----- Inserts -----
static INSERTS_IN_PLACE: AtomicU64 = AtomicU64::new(0);
static INSERTS_REWRITE: AtomicU64 = AtomicU64::new(0);
static RANGE_INSERTS: AtomicU64 = AtomicU64::new(0);
static JOURNAL_REPLAYS: AtomicU64 = AtomicU64::new(0);

// ----- Validation -----
static VALIDATIONS: AtomicU64 = AtomicU64::new(0);
static CHECKSUM_FAILURES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub partitions_read: u64,
    pub bytes_read: u64,
    pub batch_reads: u64,

    pub containers_written: u64,
    pub bytes_written: u64,

    pub inserts_in_place: u64,
    pub inserts_rewrite: u64,
    pub range_inserts: u64,
    pub journal_replays: u64,

    pub validations: u64,
    pub checksum_failures: u64,
}

impl MetricsSnapshot {
    /// Доля вставок, обошедшихся без полной перезаписи.
    pub fn in_place_ratio(&self) -> f64 {
        let total = self.inserts_in_place + self.inserts_rewrite;
        if total == 0 {
            0.0
        } else {
            self.inserts_in_place as f64 / total as f64
        }
    }
}

#[inline]
pub fn record_partition_read(bytes: u64) {
    PARTITIONS_READ.fetch_add(1, Ordering::Relaxed);
    BYTES_READ.fetch_add(bytes, Ordering::Relaxed);
}

#[inline]
pub fn record_batch_read() {
    BATCH_READS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_container_written(bytes: u64) {
    CONTAINERS_WRITTEN.fetch_add(1, Ordering::Relaxed);
    BYTES_WRITTEN.fetch_add(bytes, Ordering::Relaxed);
}

#[inline]
pub fn record_insert(in_place: bool, range_inserts: u32) {
    if in_place {
        INSERTS_IN_PLACE.fetch_add(1, Ordering::Relaxed);
    } else {
        INSERTS_REWRITE.fetch_add(1, Ordering::Relaxed);
    }
    RANGE_INSERTS.fetch_add(range_inserts as u64, Ordering::Relaxed);
}

#[inline]
pub fn record_journal_replay() {
    JOURNAL_REPLAYS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_validation(failures: u64) {
    VALIDATIONS.fetch_add(1, Ordering::Relaxed);
    CHECKSUM_FAILURES.fetch_add(failures, Ordering::Relaxed);
}

pub fn metrics_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        partitions_read: PARTITIONS_READ.load(Ordering::Relaxed),
        bytes_read: BYTES_READ.load(Ordering::Relaxed),
        batch_reads: BATCH_READS.load(Ordering::Relaxed),
        containers_written: CONTAINERS_WRITTEN.load(Ordering::Relaxed),
        bytes_written: BYTES_WRITTEN.load(Ordering::Relaxed),
        inserts_in_place: INSERTS_IN_PLACE.load(Ordering::Relaxed),
        inserts_rewrite: INSERTS_REWRITE.load(Ordering::Relaxed),
        range_inserts: RANGE_INSERTS.load(Ordering::Relaxed),
        journal_replays: JOURNAL_REPLAYS.load(Ordering::Relaxed),
        validations: VALIDATIONS.load(Ordering::Relaxed),
        checksum_failures: CHECKSUM_FAILURES.load(Ordering::Relaxed),
    }
}
