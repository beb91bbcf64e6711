//! PAFF: a single-file container of ordered, checksummed byte partitions with
//! random access and in-place insertion.

// Базовые модули (без I/O контейнера)
pub mod checksum;
pub mod codec;
pub mod config;
pub mod consts;
pub mod error;
pub mod metrics;

// Файловые примитивы
pub mod atomic;
pub mod journal;
pub mod lock;
pub mod range;
pub mod util;

// High-level API: src/container/{mod,core,open,read,write,insert,validate}.rs
pub mod container;

// Удобные реэкспорты
pub use codec::{DirEntry, Metadata};
pub use config::PaffConfig;
pub use container::{
    write, write_with_config, Container, InsertOutcome, InsertStrategy, PartitionFailure,
    ValidationReport,
};
pub use error::{PaffError, Result};
pub use range::{FallocateInsert, NoRangeInsert, RangeInsert};
