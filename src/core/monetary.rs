//! Ledger constants
//!
//! Credit is a plain real number. A miner is paid a fixed incentive per block;
//! there are no fees and no halving.

/// Credit paid to the miner of every block
pub const MINING_INCENTIVE: f64 = 1.0;

/// Proof stored in the genesis block
pub const GENESIS_PROOF: i64 = 100;

/// Leading zero hex characters required of a proof hash
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Amounts are compared and hashed with this many decimals
pub const AMOUNT_DECIMALS: usize = 8;

/// Rounds an amount to `AMOUNT_DECIMALS` places, dropping float noise left by sums
pub fn round_amount(amount: f64) -> f64 {
    let scale = 10f64.powi(AMOUNT_DECIMALS as i32);
    (amount * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_amount_drops_sum_noise() {
        let left = 1.0 - 0.9;
        assert!(left < 0.1);
        assert_eq!(round_amount(left), round_amount(0.1));
        assert_eq!(round_amount(0.123456789), 0.12345679);
    }
}
