//! Content identity shared by transactions and peers

/// Previous hash of the genesis block, and of any block built on an empty chain.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Sender of mining incentive transactions. It is 68 characters long so it can
/// never pass `is_well_formed_hash` and be claimed by an ordinary wallet.
pub const COINBASE_SENDER: &str =
    "00000000000000000000000000000000000000000000000000000000000000000000";

const HASH_LEN: usize = 64;

/// Anything with a content identity hash.
pub trait ContentHash {
    fn content_hash(&self) -> String;
}

/// Two entities are the same iff their identity hashes match.
pub fn hashes_equal(first: &impl ContentHash, second: &impl ContentHash) -> bool {
    first.content_hash() == second.content_hash()
}

/// Checks length and alphabet of a hash (exactly 64 lowercase hex characters).
/// It does _not_ check that a wallet with this hash exists.
pub fn is_well_formed_hash(hash: &str) -> bool {
    hash.len() == HASH_LEN && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_hash() {
        assert!(is_well_formed_hash(
            "fad5e7a92f1c43b1523614336a07f98b894bb80fee06b6763b50ab03b597d5f4"
        ));
        assert!(is_well_formed_hash(ZERO_HASH));
    }

    #[test]
    fn test_rejects_malformed_hashes() {
        // uppercase
        assert!(!is_well_formed_hash(
            "FAD5E7A92F1C43B1523614336A07F98B894BB80FEE06B6763B50AB03B597D5F4"
        ));
        // too short
        assert!(!is_well_formed_hash("fad5e7a9"));
        // not hex
        assert!(!is_well_formed_hash(
            "zad5e7a92f1c43b1523614336a07f98b894bb80fee06b6763b50ab03b597d5f4"
        ));
        assert!(!is_well_formed_hash("sender"));
    }

    #[test]
    fn test_coinbase_sender_is_never_a_wallet_hash() {
        assert!(!is_well_formed_hash(COINBASE_SENDER));
        assert!(COINBASE_SENDER.bytes().all(|b| b == b'0'));
    }
}
