//! Wallet identity and balance derivation
//!
//! A wallet is a 64-hex identity hash. Its credit is always derived from the
//! confirmed chain plus the pending pool.

#[allow(clippy::module_inception)]
pub mod wallet;

pub use wallet::{balance_of, transactions_of, Wallet};
