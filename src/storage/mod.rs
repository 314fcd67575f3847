//! In-memory storage
//!
//! The ledger lives in process memory only; this module holds the pending
//! transaction pool that the ledger assembles blocks from.

pub mod memory_pool;

pub use memory_pool::MemoryPool;
