//! Content fingerprinting for deduplication.
//!
//! The fingerprint is the SHA-256 digest of the exact document bytes, hashed
//! in fixed-size blocks so arbitrarily large files never need to be resident
//! in memory. Two identical documents collapse to the same fingerprint
//! regardless of filename or source URL.

use sha2::{Digest, Sha256};
use std::io::{self, Read};

const BLOCK_SIZE: usize = 64 * 1024;

/// Compute the streaming SHA-256 fingerprint of a reader's contents.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut block = vec![0u8; BLOCK_SIZE];

    loop {
        let read = reader.read(&mut block)?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint an in-memory byte slice.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    fingerprint_reader(io::Cursor::new(bytes)).expect("in-memory read cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_across_sources() {
        let payload = b"identical document bytes";
        let from_bytes = fingerprint_bytes(payload);
        let from_reader = fingerprint_reader(io::Cursor::new(payload.to_vec())).unwrap();
        assert_eq!(from_bytes, from_reader);
        assert_eq!(from_bytes.len(), 64);
    }

    #[test]
    fn different_bytes_produce_different_fingerprints() {
        assert_ne!(fingerprint_bytes(b"doc-a"), fingerprint_bytes(b"doc-b"));
    }

    #[test]
    fn inputs_larger_than_one_block_hash_correctly() {
        let large = vec![0xAB_u8; BLOCK_SIZE * 2 + 17];
        let streamed = fingerprint_bytes(&large);

        let mut hasher = Sha256::new();
        hasher.update(&large);
        assert_eq!(streamed, hex::encode(hasher.finalize()));
    }

    #[test]
    fn empty_input_is_the_well_known_sha256() {
        assert_eq!(
            fingerprint_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
