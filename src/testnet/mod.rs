//! Helpers for building ledgers in tests

pub mod test_utils;

pub use test_utils::*;
