//! TransactionPool: pending transaction blocks waiting for a proposer block to
//! confirm them.
//!
//! Data model:
//! - TxBlock: transaction-block id + origin + arrival sequence
//! - BTreeMap<seq, TxBlock> gives iteration in arrival order; a HashMap<id, seq>
//!   index gives O(log n) removal by id.

use crate::blockstore::types::{BlockId, OriginId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// A transaction block sitting in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxBlock {
    pub id: BlockId,
    pub origin: Option<OriginId>,
    /// arrival sequence, the pool's iteration order
    pub arrival: u64,
}

/// Error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TxPoolError {
    #[error("duplicate transaction block")]
    Duplicate,
    #[error("pool full")]
    PoolFull,
}

#[derive(Debug)]
pub struct TransactionPool {
    entries: BTreeMap<u64, TxBlock>,
    index: HashMap<BlockId, u64>,
    next_seq: u64,
    pub max_size: usize,
}

impl TransactionPool {
    pub fn new(max_size: usize) -> Self {
        Self { entries: BTreeMap::new(), index: HashMap::new(), next_seq: 0, max_size }
    }

    /// Admit a transaction block. No eviction on overflow: new arrivals are refused.
    pub fn insert(&mut self, id: BlockId, origin: Option<OriginId>) -> Result<&TxBlock, TxPoolError> {
        if self.index.contains_key(&id) {
            return Err(TxPoolError::Duplicate);
        }
        if self.entries.len() >= self.max_size {
            return Err(TxPoolError::PoolFull);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(id.clone(), seq);
        let entry = self.entries.entry(seq).or_insert(TxBlock { id, origin, arrival: seq });
        Ok(entry)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<TxBlock> {
        let seq = self.index.remove(id)?;
        self.entries.remove(&seq)
    }

    /// Remove and return every pooled block whose id is in `ids`, in pool order.
    pub fn take_matching(&mut self, ids: &HashSet<&str>) -> Vec<TxBlock> {
        let seqs: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, tx)| ids.contains(tx.id.as_str()))
            .map(|(seq, _)| *seq)
            .collect();
        let mut taken = Vec::with_capacity(seqs.len());
        for seq in seqs {
            if let Some(tx) = self.entries.remove(&seq) {
                self.index.remove(&tx.id);
                taken.push(tx);
            }
        }
        taken
    }

    /// Pool contents in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &TxBlock> + '_ {
        self.entries.values()
    }

    /// Pool size
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

    #[test]
    fn test_dedup_and_capacity() {
        let mut pool = TransactionPool::new(2);
        pool.insert("t1".into(), Some(1)).unwrap();
        assert_eq!(pool.insert("t1".into(), None).unwrap_err(), TxPoolError::Duplicate);
        pool.insert("t2".into(), None).unwrap();
        assert_eq!(pool.insert("t3".into(), None).unwrap_err(), TxPoolError::PoolFull);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_take_matching_keeps_pool_order() {
        let mut pool = TransactionPool::new(10);
        for id in ["a", "b", "c", "d"] {
            pool.insert(id.into(), None).unwrap();
        }
        let wanted: HashSet<&str> = ["d", "b", "zz"].into_iter().collect();
        let taken: Vec<_> = pool.take_matching(&wanted).into_iter().map(|t| t.id).collect();
        assert_eq!(taken, vec!["b".to_string(), "d".to_string()]);
        assert!(!pool.contains("b"));
        let left: Vec<_> = pool.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(left, vec!["a", "c"]);
        assert_eq!(pool.remove("a").map(|t| t.arrival), Some(0));
        assert_eq!(pool.len(), 1);
    }
}
