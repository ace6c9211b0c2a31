//! Window manager: keeps each chain's active set bounded by evicting the
//! oldest block, dropping its votes and capturing its refs.

use crate::blockstore::types::{BlockId, ChainRef};
use crate::blockstore::BlockStore;
use crate::blockstore::chain::Chain;
use crate::consensus::FinalizationEngine;
use crate::ledger::index::LedgerEntry;
use crate::ledger::LedgerAssembler;
use crate::utils::errors::Result;
use crate::utils::metrics::{self, METRICS};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Retention policy for one chain kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPolicy {
    /// max active blocks
    pub capacity: usize,
    /// max depth distance between oldest and newest active block
    pub span: u64,
}

impl WindowPolicy {
    pub fn should_evict(&self, chain: &Chain) -> bool {
        if chain.len() <= 1 {
            return false;
        }
        if chain.len() > self.capacity {
            return true;
        }
        match (chain.oldest(), chain.newest()) {
            (Some(oldest), Some(newest)) => newest.depth.saturating_sub(oldest.depth) > self.span,
            _ => false,
        }
    }
}

/// What one `evict_if_needed` call removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionReport {
    pub chain: ChainRef,
    pub evicted: Vec<BlockId>,
    pub votes_dropped: usize,
    pub captured: Vec<LedgerEntry>,
}

impl EvictionReport {
    fn empty(chain: ChainRef) -> Self {
        Self { chain, evicted: vec![], votes_dropped: 0, captured: vec![] }
    }

    /// Whether the window moved; dependent work waits a tick when it did.
    pub fn scrolled(&self) -> bool {
        !self.evicted.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WindowManager {
    pub proposer: WindowPolicy,
    pub voter: WindowPolicy,
}

impl WindowManager {
    pub fn new(proposer: WindowPolicy, voter: WindowPolicy) -> Self {
        Self { proposer, voter }
    }

    pub fn policy(&self, chain: ChainRef) -> &WindowPolicy {
        match chain {
            ChainRef::Proposer => &self.proposer,
            ChainRef::Voter(_) => &self.voter,
        }
    }

    /// Evict oldest-first while the chain's policy says so.
    pub fn evict_if_needed(
        &self,
        chain: ChainRef,
        store: &mut BlockStore,
        engine: &mut FinalizationEngine,
        assembler: &mut LedgerAssembler,
    ) -> Result<EvictionReport> {
        let policy = *self.policy(chain);
        let mut report = EvictionReport::empty(chain);

        while policy.should_evict(store.chain(chain)?) {
            let Some(block) = store.evict_oldest(chain)? else {
                break;
            };
            report.votes_dropped += engine.on_evicted(chain, &block.id);
            if chain.is_proposer() {
                // final capture; ids taken earlier are skipped
                report.captured.extend(assembler.capture_refs(&block.id, &block.refs));
            }
            METRICS.inc_counter(metrics::BLOCKS_EVICTED);
            debug!(%chain, block = %block.id, depth = block.depth, "evicted");
            report.evicted.push(block.id);
        }
        Ok(report)
    }
}
