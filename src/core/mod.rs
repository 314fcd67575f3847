//! Core ledger functionality
//!
//! This module contains the fundamental components including blocks,
//! transactions, the ledger itself, proof-of-work and chain resolution.

pub mod block;
pub mod blockchain;
pub mod consensus;
pub mod identity;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::{validate_chain, Blockchain, BlockchainOptions, Broadcaster, NoBroadcast};
pub use consensus::Resolver;
pub use identity::{hashes_equal, is_well_formed_hash, ContentHash, COINBASE_SENDER, ZERO_HASH};
pub use monetary::{round_amount, AMOUNT_DECIMALS, DEFAULT_DIFFICULTY, GENESIS_PROOF, MINING_INCENTIVE};
pub use proof_of_work::ProofOfWork;
pub use transaction::Transaction;
