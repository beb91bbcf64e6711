//! Общие константы формата PAFF (header, directory, sidecars, journal).

// -------- Header --------
pub const VERSION_PREFIX: &str = "PAFF ";
pub const MODE_PREFIX: &str = "mode ";
pub const PARTS_PREFIX: &str = "parts ";

/// Header (3 строки) + directory (1 строка).
pub const META_LINES: usize = 4;

pub const DEFAULT_VERSION: &str = "1.0";
pub const DEFAULT_MODE: &str = "1";

// -------- Checksum --------
/// SHA-256, lowercase hex.
pub const DIGEST_HEX_LEN: usize = 64;

// -------- Sidecars --------
pub const LOCK_EXT: &str = "lock";
pub const TMP_EXT: &str = "tmp";
pub const JOURNAL_EXT: &str = "journal";

// -------- Journal --------
// Формат записи (LE):
// [magic8="PAFFJNL1"][ver u32=1]
// [base_len u64][meta_base u64][data_pos u64][data_gap u64][meta_gap u64]
// [data_len u64][meta_len u64]
// [data bytes][meta bytes]
// [crc32c u32]  -- по всему, что выше
pub const JOURNAL_MAGIC: &[u8; 8] = b"PAFFJNL1";
pub const JOURNAL_VERSION: u32 = 1;
pub const JOURNAL_HDR_SIZE: usize = 8 + 4 + 8 * 7;
pub const JOURNAL_CRC_SIZE: usize = 4;

// -------- Range insert --------
/// Fallback, если ФС не сообщает размер блока.
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;
