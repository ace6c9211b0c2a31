pub mod index;

use crate::blockstore::types::{BlockId, BlockStatus, ChainRef, OriginId};
use crate::blockstore::BlockStore;
use crate::txpool::{TransactionPool, TxPoolError};
use crate::utils::errors::{Result, VisError};
use crate::utils::metrics::{self, METRICS};
use index::{Ledger, LedgerEntry};
use std::collections::HashSet;
use tracing::debug;

/// Moves transaction blocks from the pending pool into the ledger once a
/// proposer block that references them is confirmed.
#[derive(Debug)]
pub struct LedgerAssembler {
    pool: TransactionPool,
    ledger: Ledger,
}

impl LedgerAssembler {
    pub fn new(pool_capacity: usize) -> Self {
        Self { pool: TransactionPool::new(pool_capacity), ledger: Ledger::new() }
    }

    /// Queue a transaction block. Already-captured ids count as duplicates.
    pub fn add_transaction_block(&mut self, id: BlockId, origin: Option<OriginId>) -> Result<()> {
        if self.ledger.contains(&id) {
            return Err(VisError::DuplicateBlock(id));
        }
        match self.pool.insert(id.clone(), origin) {
            Ok(_) => Ok(()),
            Err(TxPoolError::Duplicate) => Err(VisError::DuplicateBlock(id)),
            Err(TxPoolError::PoolFull) => {
                METRICS.inc_counter(metrics::POOL_REJECTED);
                Err(VisError::PoolFull)
            }
        }
    }

    /// Capture the refs of an active proposer block. Evicted blocks were
    /// already captured on eviction and yield nothing.
    pub fn capture_confirmed(&mut self, store: &BlockStore, proposer_id: &str) -> Result<Vec<LedgerEntry>> {
        match store.status(ChainRef::Proposer, proposer_id) {
            BlockStatus::Unknown => Err(VisError::UnknownTarget(proposer_id.to_string())),
            BlockStatus::Evicted => Ok(vec![]),
            BlockStatus::Active => {
                let refs = store
                    .get(ChainRef::Proposer, proposer_id)
                    .map(|b| b.refs.clone())
                    .unwrap_or_default();
                Ok(self.capture_refs(proposer_id, &refs))
            }
        }
    }

    /// Move every pooled id in `refs` into the ledger, in pool order.
    /// Ids absent from the pool or already captured are skipped.
    pub fn capture_refs(&mut self, proposer_id: &str, refs: &[BlockId]) -> Vec<LedgerEntry> {
        let wanted: HashSet<&str> = refs
            .iter()
            .map(String::as_str)
            .filter(|id| !self.ledger.contains(id))
            .collect();
        if wanted.is_empty() {
            return vec![];
        }
        let mut added = Vec::new();
        for tx in self.pool.take_matching(&wanted) {
            if let Some(entry) = self.ledger.append(tx.id, proposer_id) {
                added.push(entry.clone());
            }
        }
        if !added.is_empty() {
            METRICS.add_counter(metrics::LEDGER_ENTRIES, added.len() as u64);
            debug!(proposer = proposer_id, captured = added.len(), "ledger extended");
        }
        added
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
