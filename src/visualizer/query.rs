//! Read-only queries for renderers and the RPC surface. Nothing here mutates.

use crate::blockstore::types::{Block, BlockStatus, ChainRef};
use crate::consensus::types::Vote;
use crate::ledger::index::LedgerEntry;
use crate::txpool::TxBlock;
use crate::utils::errors::{Result, VisError};
use crate::utils::metrics::METRICS;
use crate::visualizer::Visualizer;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct WeightView {
    pub id: String,
    pub status: BlockStatus,
    /// `None` once the block has been evicted
    pub weight: Option<f64>,
    pub finalized: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisStatus {
    pub voter_chains: u16,
    pub proposer_window: usize,
    pub deepest_proposer: Block,
    pub pool_size: usize,
    pub ledger_size: usize,
    pub pending_votes: usize,
    pub finalized: u64,
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
}

impl Visualizer {
    pub fn deepest_block(&self, chain: ChainRef) -> Result<Block> {
        self.store().deepest_block(chain).cloned()
    }

    /// Active blocks of `chain`, oldest first.
    pub fn active_window(&self, chain: ChainRef) -> Result<Vec<Block>> {
        Ok(self.store().chain(chain)?.window().cloned().collect())
    }

    /// Ledger entries from position `from`, at most `limit` of them.
    pub fn ledger(&self, from: u64, limit: usize) -> Vec<LedgerEntry> {
        self.assembler()
            .ledger()
            .entries()
            .iter()
            .skip(from as usize)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn pending_votes(&self) -> Vec<Vote> {
        self.engine().pending_votes().to_vec()
    }

    pub fn finalization_weight(&self, id: &str) -> Result<WeightView> {
        let store = self.store();
        match store.status(ChainRef::Proposer, id) {
            BlockStatus::Unknown => Err(VisError::UnknownTarget(id.to_string())),
            status => {
                let block = store.get(ChainRef::Proposer, id);
                Ok(WeightView {
                    id: id.to_string(),
                    status,
                    weight: block.map(|b| b.finalization_weight.as_fraction()),
                    finalized: block.map(|b| b.finalized),
                })
            }
        }
    }

    pub fn transaction_pool(&self) -> Vec<TxBlock> {
        self.assembler().pool().iter().cloned().collect()
    }

    pub fn status(&self) -> Result<VisStatus> {
        let (counters, gauges) = METRICS.snapshot();
        Ok(VisStatus {
            voter_chains: self.store().voter_chain_count(),
            proposer_window: self.store().proposer().len(),
            deepest_proposer: self.deepest_block(ChainRef::Proposer)?,
            pool_size: self.assembler().pool().len(),
            ledger_size: self.assembler().ledger().len(),
            pending_votes: self.engine().pending_votes().len(),
            finalized: self.engine().snapshot().finalized,
            counters,
            gauges,
        })
    }
}
