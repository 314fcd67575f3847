use crate::core::monetary::DEFAULT_DIFFICULTY;
use crate::utils::content_hash;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};

// How many candidates are tried between two looks at the stop signal
const STOP_CHECK_INTERVAL: i64 = 1 << 12;

/// Brute-force proof search: a proof is valid when the hash of the previous
/// proof followed by the candidate starts with `difficulty` zero characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> ProofOfWork {
        ProofOfWork { difficulty }
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn valid_proof(&self, last_proof: i64, proof: i64) -> bool {
        let guess = format!("{last_proof}{proof}");
        content_hash(guess.as_bytes())
            .bytes()
            .take(self.difficulty)
            .filter(|b| *b == b'0')
            .count()
            == self.difficulty
    }

    /// Searches upwards from 0 for the first valid proof. Blocks until one is
    /// found; returns `None` only when `stop` is raised.
    pub fn solve(&self, last_proof: i64, stop: &AtomicBool) -> Option<i64> {
        let mut proof: i64 = 0;
        while !self.valid_proof(last_proof, proof) {
            proof += 1;
            if proof % STOP_CHECK_INTERVAL == 0 && stop.load(Ordering::Relaxed) {
                info!("Proof search after {last_proof} stopped at candidate {proof}");
                return None;
            }
        }
        info!(
            "Proof found in {} cycles (difficulty {})",
            proof + 1,
            self.difficulty
        );
        Some(proof)
    }
}
