//! checksum - дайджест партиции.
//!
//! SHA-256 по сырым байтам партиции (binary-safe, без текстовой нормализации),
//! хранится в directory как lowercase hex (64 символа).

use sha2::{Digest, Sha256};

use crate::consts::DIGEST_HEX_LEN;

/// Digest of the exact partition bytes, lowercase hex.
pub fn checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// true = дайджест совпал.
#[inline]
pub fn verify(bytes: &[u8], expected: &str) -> bool {
    checksum(bytes) == expected
}

/// Синтаксическая проверка токена дайджеста из directory.
pub fn is_valid_digest(token: &str) -> bool {
    token.len() == DIGEST_HEX_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn raw_bytes_not_text() {
        // Невалидный UTF-8 тоже хэшируется как есть
        let a = checksum(&[0xff, 0xfe, 0x00]);
        let b = checksum(&[0xff, 0xfe, 0x01]);
        assert_ne!(a, b);
        assert!(is_valid_digest(&a));
    }

    #[test]
    fn verify_detects_flip() {
        let data = b"partition".to_vec();
        let sum = checksum(&data);
        assert!(verify(&data, &sum));
        let mut bad = data.clone();
        bad[3] ^= 0x01;
        assert!(!verify(&bad, &sum));
    }

    #[test]
    fn digest_token_syntax() {
        assert!(!is_valid_digest("abc"));
        assert!(!is_valid_digest(&"A".repeat(DIGEST_HEX_LEN)));
        assert!(is_valid_digest(&"0".repeat(DIGEST_HEX_LEN)));
    }
}
