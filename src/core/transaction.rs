// This file implements transactions - how value moves between wallet hashes
// There are no inputs or signatures here: a transaction names a sender, and the
// sender's credit is derived from the ledger when the transaction is admitted.

use crate::core::identity::{is_well_formed_hash, ContentHash, COINBASE_SENDER};
use crate::core::monetary::{round_amount, AMOUNT_DECIMALS};
use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::{content_hash, current_timestamp};
use crate::wallet::balance_of;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    recipient: String,
    amount: f64,
    #[serde(default)]
    message: String,
    // 0 means "not stamped yet"; the receiving node assigns the time
    #[serde(default)]
    time: i64,
}

impl Transaction {
    // An unstamped transaction as a client would submit it
    pub fn new(sender: &str, recipient: &str, amount: f64, message: &str) -> Transaction {
        Self::new_with_time(sender, recipient, amount, message, 0)
    }

    pub fn new_with_time(
        sender: &str,
        recipient: &str,
        amount: f64,
        message: &str,
        time: i64,
    ) -> Transaction {
        Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            message: message.to_string(),
            time,
        }
    }

    // The incentive paid to a miner, created by the ledger when mining
    pub fn new_coinbase_tx(recipient: &str, amount: f64, message: &str) -> Result<Transaction> {
        Ok(Self::new_with_time(
            COINBASE_SENDER,
            recipient,
            amount,
            message,
            current_timestamp()?,
        ))
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_amount(&self) -> f64 {
        self.amount
    }

    pub fn get_message(&self) -> &str {
        self.message.as_str()
    }

    pub fn get_time(&self) -> i64 {
        self.time
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    /// Drops any client supplied time so the receiving node stamps it.
    pub fn without_time(mut self) -> Transaction {
        self.time = 0;
        self
    }

    pub(crate) fn stamp_if_unset(&mut self) -> Result<()> {
        if self.time == 0 {
            self.time = current_timestamp()?;
        }
        Ok(())
    }

    /// Identity hash over sender, recipient, amount (8 decimals) and time.
    pub fn get_hash(&self) -> String {
        let data = format!(
            "{}{}{:.*}{}",
            self.sender, self.recipient, AMOUNT_DECIMALS, self.amount, self.time
        );
        content_hash(data.as_bytes())
    }

    /// Checks format and balance against a confirmed chain and a pending pool.
    /// The transaction itself must not be part of `pending`.
    pub fn validate(&self, chain: &[Block], pending: &[Transaction]) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(BlockchainError::InvalidFormat(format!(
                "amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        if !self.is_coinbase() && !is_well_formed_hash(&self.sender) {
            return Err(BlockchainError::InvalidSender(self.sender.clone()));
        }
        if !is_well_formed_hash(&self.recipient) {
            return Err(BlockchainError::InvalidRecipient(self.recipient.clone()));
        }
        if !self.is_coinbase() {
            let available = balance_of(&self.sender, chain, pending);
            if round_amount(available) < round_amount(self.amount) {
                return Err(BlockchainError::InsufficientBalance {
                    required: self.amount,
                    available,
                });
            }
        }
        Ok(())
    }
}

impl ContentHash for Transaction {
    fn content_hash(&self) -> String {
        self.get_hash()
    }
}
