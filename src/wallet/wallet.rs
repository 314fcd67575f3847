use crate::core::{Block, Transaction};
use crate::error::Result;
use crate::utils::{content_hash, current_timestamp};
use serde::{Deserialize, Serialize};

/// A wallet is only its identity hash. Credit is never stored; it is derived
/// from the ledger whenever it is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    hash: String,
}

impl Wallet {
    /// Create a wallet whose hash is derived from the creation time.
    pub fn new() -> Result<Wallet> {
        let mut seed = current_timestamp()?.to_be_bytes().to_vec();
        // two wallets created within the same nanosecond must still differ
        seed.extend(rand::random::<u64>().to_be_bytes());
        Ok(Wallet {
            hash: content_hash(seed.as_slice()),
        })
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }
}

/// Net credit of `hash` over every confirmed and pending transaction.
pub fn balance_of(hash: &str, chain: &[Block], pending: &[Transaction]) -> f64 {
    let confirmed = chain.iter().flat_map(|block| block.get_transactions());
    let mut sum = 0.0;
    for tr in confirmed.chain(pending.iter()) {
        if tr.get_recipient() == hash {
            sum += tr.get_amount();
        }
        if tr.get_sender() == hash {
            sum -= tr.get_amount();
        }
    }
    sum
}

/// Confirmed transactions where `hash` is the sender or the recipient.
pub fn transactions_of(hash: &str, chain: &[Block]) -> Vec<Transaction> {
    chain
        .iter()
        .flat_map(|block| block.get_transactions())
        .filter(|tr| tr.get_sender() == hash || tr.get_recipient() == hash)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{is_well_formed_hash, COINBASE_SENDER, ZERO_HASH};

    const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn block_with(transactions: Vec<Transaction>) -> Block {
        Block::new_test_block(1, 0, transactions, 100, ZERO_HASH.to_string())
    }

    #[test]
    fn test_wallet_hash_is_well_formed_and_unique() {
        let first = Wallet::new().unwrap();
        let second = Wallet::new().unwrap();
        assert!(is_well_formed_hash(first.get_hash()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_balance_counts_confirmed_and_pending() {
        let chain = vec![block_with(vec![Transaction::new_with_time(
            COINBASE_SENDER,
            ALICE,
            5.0,
            "",
            1,
        )])];
        let pending = vec![Transaction::new_with_time(ALICE, BOB, 2.0, "", 2)];

        assert_eq!(balance_of(ALICE, &chain, &pending), 3.0);
        assert_eq!(balance_of(BOB, &chain, &pending), 2.0);
        assert_eq!(balance_of(ALICE, &chain, &[]), 5.0);
    }

    #[test]
    fn test_unknown_wallet_has_no_credit() {
        assert_eq!(balance_of(ALICE, &[], &[]), 0.0);
    }

    #[test]
    fn test_history_only_includes_confirmed() {
        let chain = vec![block_with(vec![
            Transaction::new_with_time(COINBASE_SENDER, ALICE, 5.0, "", 1),
            Transaction::new_with_time(COINBASE_SENDER, BOB, 1.0, "", 2),
        ])];
        let history = transactions_of(ALICE, &chain);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].get_recipient(), ALICE);
    }
}
