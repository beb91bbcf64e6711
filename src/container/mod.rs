//! container - high-level API контейнера PAFF.
//!
//! Разделение по подмодулям:
//! - core.rs     - Container, State (File + Metadata), stale‑detection, lock helpers
//! - open.rs     - open/open_with_config/open_with, close, reload, replay журнала
//! - read.rs     - read_partition / read_partitions (параллельно, rayon)
//! - write.rs    - write/create: полная запись через tmp+rename
//! - insert.rs   - insert_partition: range‑insert на месте или полная перезапись
//! - validate.rs - валидация header/directory и чексумм, отчёт

pub mod core;
pub mod insert;
pub mod open;
pub mod read;
pub mod validate;
pub mod write;

pub use self::core::Container;
pub use insert::{InsertOutcome, InsertStrategy};
pub use validate::{PartitionFailure, ValidationReport};
pub use write::{write, write_with_config};
