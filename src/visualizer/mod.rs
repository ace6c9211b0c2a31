//! Visualizer core: applies normalized events to the block store, the
//! finalization engine, the ledger assembler and the window manager, one
//! event at a time.

pub mod query;
pub mod queue;

use crate::blockstore::types::{BlockId, ChainRef};
use crate::blockstore::BlockStore;
use crate::consensus::types::FinalityConfig;
use crate::consensus::FinalizationEngine;
use crate::events::VisEvent;
use crate::ledger::index::LedgerEntry;
use crate::ledger::LedgerAssembler;
use crate::utils::errors::{Result, VisError};
use crate::utils::metrics::{self, METRICS};
use crate::window::{EvictionReport, WindowManager, WindowPolicy};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub use queue::EventQueue;

/// Shared handle: the event loop writes, query handlers read.
pub type SharedVisualizer = Arc<RwLock<Visualizer>>;

/// Sizing for a `Visualizer`.
#[derive(Debug, Clone, Copy)]
pub struct VisualizerParams {
    pub voter_chains: u16,
    pub finality: FinalityConfig,
    pub proposer_window: WindowPolicy,
    pub voter_window: WindowPolicy,
    pub pool_capacity: usize,
    pub tombstone_limit: usize,
}

/// Side effects of applying one event.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepOutcome {
    /// events postponed to the next tick
    pub deferred: Vec<VisEvent>,
    pub finalized: Vec<BlockId>,
    pub captured: Vec<LedgerEntry>,
    pub eviction: Option<EvictionReport>,
}

#[derive(Debug)]
pub struct Visualizer {
    store: BlockStore,
    engine: FinalizationEngine,
    assembler: LedgerAssembler,
    windows: WindowManager,
    /// voter chains that accepted a block since their last vote pass
    advanced: HashSet<u16>,
    /// voter chains whose window scrolled since their last vote pass
    deferred_votes: HashSet<u16>,
}

impl Visualizer {
    pub fn new(params: VisualizerParams) -> Self {
        Self {
            store: BlockStore::new(params.voter_chains, params.finality.base_weight, params.tombstone_limit),
            engine: FinalizationEngine::new(params.finality, params.voter_chains),
            assembler: LedgerAssembler::new(params.pool_capacity),
            windows: WindowManager::new(params.proposer_window, params.voter_window),
            advanced: HashSet::new(),
            deferred_votes: HashSet::new(),
        }
    }

    pub fn shared(self) -> SharedVisualizer {
        Arc::new(RwLock::new(self))
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn engine(&self) -> &FinalizationEngine {
        &self.engine
    }

    pub fn assembler(&self) -> &LedgerAssembler {
        &self.assembler
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    /// Apply one event. Errors leave state as it was before the failing step.
    pub fn apply(&mut self, event: VisEvent) -> Result<StepOutcome> {
        let mut outcome = StepOutcome::default();
        match event {
            VisEvent::AddBlock { chain, id, parent, origin, refs } => {
                self.store.add_block(chain, id.clone(), &parent, origin, refs)?;
                METRICS.inc_counter(metrics::BLOCKS_ADDED);
                let report =
                    self.windows
                        .evict_if_needed(chain, &mut self.store, &mut self.engine, &mut self.assembler)?;
                let scrolled = report.scrolled();
                outcome.captured.extend(report.captured.iter().cloned());

                match chain {
                    ChainRef::Proposer if scrolled => {
                        outcome.deferred.push(VisEvent::CaptureConfirmed { id });
                    }
                    ChainRef::Proposer => {
                        outcome.captured.extend(self.assembler.capture_confirmed(&self.store, &id)?);
                    }
                    ChainRef::Voter(c) => {
                        self.advanced.insert(c);
                        if scrolled {
                            self.deferred_votes.insert(c);
                        }
                    }
                }
                if scrolled {
                    outcome.eviction = Some(report);
                }
            }
            VisEvent::CastVotesForFrontier { chain } => {
                self.store.chain(ChainRef::Voter(chain))?;
                // a pass only follows an accepted voter block
                if !self.advanced.contains(&chain) {
                    debug!(chain, "no new voter block, vote pass skipped");
                } else if self.deferred_votes.remove(&chain) {
                    outcome.deferred.push(VisEvent::CastVotesForFrontier { chain });
                } else {
                    self.advanced.remove(&chain);
                    let votes = self.engine.cast_votes_for_frontier(&mut self.store, chain)?;
                    outcome.finalized.extend(votes.into_iter().filter(|(_, o)| o.crossed()).map(|(id, _)| id));
                }
            }
            VisEvent::AddTransactionBlock { id, origin } => {
                self.assembler.add_transaction_block(id, origin)?;
            }
            VisEvent::ConfirmBlocks { ids } => {
                for id in ids {
                    match self.engine.finalize(&mut self.store, &id) {
                        Ok(true) => outcome.finalized.push(id.clone()),
                        Ok(false) => {}
                        Err(e) => {
                            debug!(block = %id, "confirmation skipped: {}", e);
                            continue;
                        }
                    }
                    outcome.captured.extend(self.assembler.capture_confirmed(&self.store, &id)?);
                }
            }
            VisEvent::CaptureConfirmed { id } => {
                outcome.captured.extend(self.assembler.capture_confirmed(&self.store, &id)?);
            }
        }
        METRICS.inc_counter(metrics::EVENTS_APPLIED);
        Ok(outcome)
    }

    /// Apply one event; failures are logged and counted, never propagated.
    pub fn handle(&mut self, event: VisEvent) -> StepOutcome {
        let kind = event.kind();
        match self.apply(event) {
            Ok(outcome) => outcome,
            Err(e) => {
                METRICS.inc_counter(metrics::EVENTS_DROPPED);
                if let Some(counter) = error_counter(&e) {
                    METRICS.inc_counter(counter);
                }
                if e.is_benign() {
                    debug!(event = kind, "ignored: {}", e);
                } else {
                    warn!(event = kind, "dropped: {}", e);
                }
                StepOutcome::default()
            }
        }
    }

    /// Publish window/pool/ledger sizes as gauges.
    pub fn publish_gauges(&self) {
        METRICS.set_gauge("window_proposer", self.store.proposer().len() as f64);
        let voter_blocks: usize = self.store.voters().map(|c| c.len()).sum();
        METRICS.set_gauge("window_voter_total", voter_blocks as f64);
        METRICS.set_gauge("pool_size", self.assembler.pool().len() as f64);
        METRICS.set_gauge("ledger_size", self.assembler.ledger().len() as f64);
        METRICS.set_gauge("pending_votes", self.engine.pending_votes().len() as f64);
    }
}

fn error_counter(e: &VisError) -> Option<&'static str> {
    match e {
        VisError::DuplicateBlock(_) => Some(metrics::BLOCKS_DUPLICATE),
        VisError::UnknownParent { .. } => Some(metrics::BLOCKS_UNKNOWN_PARENT),
        VisError::IllegalFork { .. } => Some(metrics::BLOCKS_ILLEGAL_FORK),
        VisError::PoolFull => Some(metrics::POOL_REJECTED),
        _ => None,
    }
}
