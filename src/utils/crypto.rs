use ring::digest::{Context, SHA256};

use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch.
pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Io(format!("System time error: {e}")))?
        .as_nanos();

    // Ensure the timestamp fits in i64
    if duration > i64::MAX as u128 {
        return Err(BlockchainError::Io("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 of `data` as 64 lowercase hex characters.
pub fn content_hash(data: &[u8]) -> String {
    HEXLOWER.encode(sha256_digest(data).as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_known_vector() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_content_hash_is_lowercase_hex() {
        let hash = content_hash(b"peer-chain");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_timestamps_are_nanoseconds() {
        let first = current_timestamp().unwrap();
        let second = current_timestamp().unwrap();
        assert!(second >= first);
        // anything after 2001 in nanoseconds is above 10^18
        assert!(first > 1_000_000_000_000_000_000);
    }
}
