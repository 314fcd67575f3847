use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{content_hash, current_timestamp, deserialize, serialize};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    timestamp: i64, // nanoseconds, informational only
    transactions: Vec<Transaction>,
    proof: i64,
    previous_hash: String,
}

impl Block {
    pub fn new_block(
        index: u64,
        transactions: Vec<Transaction>,
        proof: i64,
        previous_hash: String,
    ) -> Result<Block> {
        Ok(Block {
            index,
            timestamp: current_timestamp()?,
            transactions,
            proof,
            previous_hash,
        })
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// Content hash over the canonical encoding of the whole block.
    pub fn hash(&self) -> Result<String> {
        Ok(content_hash(self.serialize()?.as_slice()))
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_proof(&self) -> i64 {
        self.proof
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    /// Create a test block with a fixed timestamp (for testing only)
    #[cfg(test)]
    pub fn new_test_block(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        proof: i64,
        previous_hash: String,
    ) -> Block {
        Block {
            index,
            timestamp,
            transactions,
            proof,
            previous_hash,
        }
    }

    #[cfg(test)]
    pub fn set_previous_hash(&mut self, previous_hash: &str) {
        self.previous_hash = previous_hash.to_string();
    }
}
