//! Test utilities for ledger testing

use crate::core::{Block, Blockchain, BlockchainOptions, Broadcaster, NoBroadcast, Transaction};
use crate::wallet::Wallet;
use std::sync::{Arc, Mutex};

pub const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// Options paying a fresh wallet, with an easy difficulty for fast tests
pub fn test_options(difficulty: usize) -> BlockchainOptions {
    let miner = Wallet::new().unwrap();
    BlockchainOptions::new(difficulty, miner.get_hash(), "http://localhost:8000")
}

/// Keeps every announced block instead of sending it anywhere
#[derive(Default)]
pub struct RecordingBroadcaster {
    blocks: Mutex<Vec<Block>>,
}

impl RecordingBroadcaster {
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.lock().unwrap().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast_block(&self, block: &Block) {
        self.blocks.lock().unwrap().push(block.clone());
    }
}

/// A bootstrap ledger holding only the genesis block
pub fn create_test_blockchain(difficulty: usize) -> Blockchain {
    Blockchain::create_genesis(test_options(difficulty), Arc::new(NoBroadcast)).unwrap()
}

/// A ledger of `length` blocks: genesis plus mined blocks
pub fn create_mined_blockchain(difficulty: usize, length: usize) -> Blockchain {
    let blockchain = create_test_blockchain(difficulty);
    while blockchain.len() < length {
        blockchain.mine().unwrap();
    }
    blockchain
}

/// Pools an incentive-style credit for `wallet`
pub fn fund_wallet(blockchain: &Blockchain, wallet: &str, amount: f64) -> Transaction {
    let credit = Transaction::new_coinbase_tx(wallet, amount, "test funding").unwrap();
    blockchain.admit(credit).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mined_blockchain() {
        let blockchain = create_mined_blockchain(1, 4);
        assert_eq!(blockchain.len(), 4);
        assert!(blockchain.validate());
    }

    #[test]
    fn test_fund_wallet() {
        let blockchain = create_test_blockchain(1);
        fund_wallet(&blockchain, ALICE, 2.5);
        assert_eq!(blockchain.balance_of(ALICE), 2.5);
        assert_eq!(blockchain.balance_of(BOB), 0.0);
    }
}
