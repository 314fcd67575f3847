//! Utility functions and helpers
//!
//! This module contains the hashing primitives, timestamps and the canonical
//! encoding used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{content_hash, current_timestamp, sha256_digest};

pub use serialization::{deserialize, serialize};
