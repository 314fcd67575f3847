//! # Peer Chain - a small proof-of-work ledger run by a network of HTTP nodes
//!
//! Every node keeps the whole chain and a pool of pending transactions in
//! memory. When I come back to this code, here's what I need to remember:
//!
//! ## What I Built
//! - **Ledger**: blocks linked by content hash, sealed by a proof-of-work puzzle
//! - **Account-style credit**: a wallet is a hash; its credit is derived from
//!   every confirmed and pending transaction that names it
//! - **Gossip**: blocks and transactions are pushed to every known peer
//! - **Resolution**: the longest valid chain among the peers wins
//! - **Backfill**: a block from the future makes me fetch the blocks I missed
//!
//! ## How I Organized My Code
//! - `core/`: blocks, transactions, the ledger, mining and chain resolution
//! - `wallet/`: wallet hashes and balance derivation
//! - `network/`: peer registry, gossip, the peer client and the HTTP server
//! - `storage/`: the pending transaction pool
//! - `config/`: TOML and environment configuration
//! - `utils/`: hashing, timestamps and the canonical JSON encoding
//! - `cli/`: command-line interface
//!
//! ## When I Need to Understand Something
//! 1. Start with `network/server.rs` to see every endpoint
//! 2. Look at `core/blockchain.rs` for how blocks are made and accepted
//! 3. Check `core/consensus.rs` for how a node catches up with the network
//! 4. Review `network/gossip.rs` for what gets sent to peers and when

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Block, Blockchain, BlockchainOptions, Broadcaster, NoBroadcast, ProofOfWork, Resolver,
    Transaction,
};
pub use error::{BlockchainError, Result};
pub use network::{Gossip, Node, Nodes, PeerClient, Server};
pub use storage::MemoryPool;
pub use utils::{content_hash, current_timestamp, sha256_digest};
pub use wallet::{balance_of, Wallet};
