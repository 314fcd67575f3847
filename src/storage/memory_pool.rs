use crate::core::Transaction;
use std::collections::HashSet;

/// Pending transactions in arrival order, indexed by identity hash.
///
/// The pool is owned by the ledger and only touched under the ledger lock, so
/// it carries no lock of its own.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    entries: Vec<Transaction>,
    ids: HashSet<String>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool::default()
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.ids.contains(txid)
    }

    /// Adds the transaction unless its identity hash is already pooled.
    pub fn add(&mut self, tx: Transaction) -> bool {
        if !self.ids.insert(tx.get_hash()) {
            return false;
        }
        self.entries.push(tx);
        true
    }

    /// Removes every transaction whose identity hash appears in `confirmed`.
    /// Returns how many were removed.
    pub fn prune(&mut self, confirmed: &[Transaction]) -> usize {
        let confirmed: HashSet<String> = confirmed.iter().map(|tx| tx.get_hash()).collect();
        let before = self.entries.len();
        self.entries.retain(|tx| !confirmed.contains(&tx.get_hash()));
        self.ids.retain(|id| !confirmed.contains(id));
        before - self.entries.len()
    }

    /// Empties the pool, handing back its transactions in arrival order.
    pub fn drain(&mut self) -> Vec<Transaction> {
        self.ids.clear();
        std::mem::take(&mut self.entries)
    }

    pub fn get_all(&self) -> &[Transaction] {
        self.entries.as_slice()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn tx(time: i64) -> Transaction {
        Transaction::new_with_time(ALICE, BOB, 1.0, "", time)
    }

    #[test]
    fn test_add_rejects_same_identity() {
        let mut pool = MemoryPool::new();
        assert!(pool.add(tx(1)));
        assert!(!pool.add(tx(1)));
        assert!(pool.add(tx(2)));
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&tx(1).get_hash()));
    }

    #[test]
    fn test_prune_keeps_unconfirmed_in_order() {
        let mut pool = MemoryPool::new();
        for time in 1..=4 {
            pool.add(tx(time));
        }

        let removed = pool.prune(&[tx(2), tx(4), tx(9)]);

        assert_eq!(removed, 2);
        let times: Vec<i64> = pool.get_all().iter().map(|t| t.get_time()).collect();
        assert_eq!(times, vec![1, 3]);
        assert!(!pool.contains(&tx(2).get_hash()));
        // a pruned transaction may be pooled again
        assert!(pool.add(tx(2)));
    }

    #[test]
    fn test_drain_empties_pool() {
        let mut pool = MemoryPool::new();
        pool.add(tx(1));
        pool.add(tx(2));

        let drained = pool.drain();

        assert_eq!(drained.len(), 2);
        assert!(pool.is_empty());
        assert!(pool.add(tx(1)));
    }
}
