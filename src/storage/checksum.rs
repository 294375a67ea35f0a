//! CRC32 checksums for commit-log frames
//!
//! Every frame carries a CRC32 (IEEE) over all bytes preceding it.
//! Replay verifies it before a frame is applied.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"{\"name\":\"Big Little Lies\"}";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_single_bit_flip_changes_checksum() {
        let mut data = b"books:42".to_vec();
        let original = compute_checksum(&data);
        data[3] ^= 0x01;
        assert_ne!(original, compute_checksum(&data));
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"commit frame";
        let checksum = compute_checksum(data);
        assert!(verify_checksum(data, checksum));
        assert!(!verify_checksum(data, checksum ^ 1));
    }
}
