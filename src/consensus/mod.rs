//! Finalization engine: votes from voter chains raise proposer-block weight
//! until it crosses the threshold.
//!
//! Public surface:
//! - FinalizationEngine: cast_vote, finalize, cast_votes_for_frontier, on_evicted
//! - types, consensus_state

pub mod consensus_state;
pub mod types;

use crate::blockstore::types::{Block, BlockId, BlockStatus, ChainRef};
use crate::blockstore::BlockStore;
use crate::consensus::consensus_state::{ConsensusSnapshot, ConsensusState};
use crate::consensus::types::{FinalityConfig, Vote, VoteOutcome, Weight};
use crate::utils::errors::{Result, VisError};
use crate::utils::metrics::{self, METRICS};
use tracing::{debug, info};

#[derive(Debug)]
pub struct FinalizationEngine {
    config: FinalityConfig,
    state: ConsensusState,
}

impl FinalizationEngine {
    pub fn new(config: FinalityConfig, voter_chains: u16) -> Self {
        Self { config, state: ConsensusState::new(voter_chains) }
    }

    pub fn config(&self) -> &FinalityConfig {
        &self.config
    }

    /// One vote from `voter_chain` for proposer block `target`.
    ///
    /// Unknown targets are an error; every other refusal is a no-op outcome.
    pub fn cast_vote(&mut self, store: &mut BlockStore, voter_chain: u16, target: &str) -> Result<VoteOutcome> {
        let from_block = store.deepest_block(ChainRef::Voter(voter_chain))?.id.clone();
        match store.status(ChainRef::Proposer, target) {
            BlockStatus::Unknown => return Err(VisError::UnknownTarget(target.to_string())),
            BlockStatus::Evicted => return Ok(VoteOutcome::TargetEvicted),
            BlockStatus::Active => {}
        }

        let proposer = store.chain_mut(ChainRef::Proposer)?;
        let block = proposer.get_mut(target).ok_or_else(|| VisError::UnknownTarget(target.to_string()))?;
        if block.finalized {
            METRICS.inc_counter(metrics::VOTES_AFTER_FINALIZATION);
            return Ok(VoteOutcome::AlreadyFinalized);
        }
        if self.state.has_voted(voter_chain, target) {
            return Ok(VoteOutcome::AlreadyVoted);
        }
        if self.state.cursor(voter_chain).map_or(false, |c| c >= block.index) {
            return Ok(VoteOutcome::CursorPast);
        }

        let weight = block.finalization_weight.saturating_add(self.config.vote_increment);
        block.finalization_weight = weight;
        let crossed = weight > self.config.threshold;
        let index = block.index;
        if crossed {
            block.finalized = true;
        }

        let vote = Vote {
            voter_chain,
            from_block,
            target: target.to_string(),
            increment: self.config.vote_increment,
        };
        self.state.record_vote(vote, !crossed);
        self.state.advance_cursor(voter_chain, index);
        METRICS.inc_counter(metrics::VOTES_CAST);

        if crossed {
            self.on_finalized(target, weight);
        } else {
            debug!(voter_chain, target, %weight, "vote counted");
        }
        Ok(VoteOutcome::Counted { weight, crossed })
    }

    /// Mark a proposer block finalized without votes (external confirmation).
    ///
    /// Returns true only on the call that changed state.
    pub fn finalize(&mut self, store: &mut BlockStore, id: &str) -> Result<bool> {
        match store.status(ChainRef::Proposer, id) {
            BlockStatus::Unknown => return Err(VisError::UnknownTarget(id.to_string())),
            BlockStatus::Evicted => return Ok(false),
            BlockStatus::Active => {}
        }
        let proposer = store.chain_mut(ChainRef::Proposer)?;
        let block = proposer.get_mut(id).ok_or_else(|| VisError::UnknownTarget(id.to_string()))?;
        if block.finalized {
            return Ok(false);
        }
        block.finalized = true;
        let weight = block.finalization_weight;
        self.on_finalized(id, weight);
        Ok(true)
    }

    fn on_finalized(&mut self, id: &str, weight: Weight) {
        let dropped = self.state.drop_live_votes_for(id);
        self.state.mark_finalized();
        METRICS.inc_counter(metrics::BLOCKS_FINALIZED);
        info!(block = id, %weight, dropped, "proposer block finalized");
    }

    /// Vote from `voter_chain` for every eligible proposer block after its cursor,
    /// up to the deepest proposer block, in increasing index order.
    pub fn cast_votes_for_frontier(
        &mut self,
        store: &mut BlockStore,
        voter_chain: u16,
    ) -> Result<Vec<(BlockId, VoteOutcome)>> {
        self.cast_votes_for_frontier_with(store, voter_chain, |_| true)
    }

    /// Like `cast_votes_for_frontier`, with a caller predicate to skip blocks
    /// the consumer cannot place.
    pub fn cast_votes_for_frontier_with<F>(
        &mut self,
        store: &mut BlockStore,
        voter_chain: u16,
        mut eligible: F,
    ) -> Result<Vec<(BlockId, VoteOutcome)>>
    where
        F: FnMut(&Block) -> bool,
    {
        store.chain(ChainRef::Voter(voter_chain))?;
        let upper = store.deepest_block(ChainRef::Proposer)?.index;
        let cursor = self.state.cursor(voter_chain);

        let mut targets: Vec<(u64, BlockId)> = store
            .proposer()
            .window()
            .filter(|b| cursor.map_or(true, |c| b.index > c) && b.index <= upper)
            .filter(|b| !b.finalized)
            .filter(|b| eligible(b))
            .map(|b| (b.index, b.id.clone()))
            .collect();
        targets.sort_by_key(|(index, _)| *index);

        let mut out = Vec::with_capacity(targets.len());
        for (_, id) in targets {
            let outcome = self.cast_vote(store, voter_chain, &id)?;
            out.push((id, outcome));
        }
        Ok(out)
    }

    /// Drop votes that reference an evicted block. Returns how many live votes went.
    pub fn on_evicted(&mut self, chain: ChainRef, id: &str) -> usize {
        match chain {
            ChainRef::Proposer => self.state.forget_target(id),
            ChainRef::Voter(_) => 0,
        }
    }

    pub fn pending_votes(&self) -> &[Vote] {
        self.state.live_votes()
    }

    pub fn cursor(&self, voter_chain: u16) -> Option<u64> {
        self.state.cursor(voter_chain)
    }

    pub fn snapshot(&self) -> ConsensusSnapshot {
        self.state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::proposer_genesis_id;

    fn setup(chains: u16) -> (BlockStore, FinalizationEngine) {
        let cfg = FinalityConfig::default();
        (BlockStore::new(chains, cfg.base_weight, 64), FinalizationEngine::new(cfg, chains))
    }

    #[test]
    fn test_threshold_crossed_on_sixth_vote() {
        let (mut store, mut engine) = setup(8);
        store.add_block(ChainRef::Proposer, "p1".into(), &proposer_genesis_id(), None, vec![]).unwrap();
        store.add_block(ChainRef::Proposer, "p2".into(), "p1", None, vec![]).unwrap();

        for chain in 0..3 {
            assert!(engine.cast_vote(&mut store, chain, "p1").unwrap().counted());
        }
        let p1 = store.get(ChainRef::Proposer, "p1").unwrap();
        assert_eq!(p1.finalization_weight, Weight::from_fraction(0.33));
        assert!(!p1.finalized);

        let mut crossings = 0;
        for chain in 3..8 {
            if engine.cast_vote(&mut store, chain, "p1").unwrap().crossed() {
                crossings += 1;
                assert_eq!(chain, 5);
            }
        }
        assert_eq!(crossings, 1);
        assert!(store.get(ChainRef::Proposer, "p1").unwrap().finalized);
        assert!(engine.pending_votes().iter().all(|v| v.target != "p1"));
    }

    #[test]
    fn test_noop_outcomes() {
        let (mut store, mut engine) = setup(2);
        store.add_block(ChainRef::Proposer, "p1".into(), &proposer_genesis_id(), None, vec![]).unwrap();
        store.add_block(ChainRef::Proposer, "p2".into(), "p1", None, vec![]).unwrap();

        assert!(engine.cast_vote(&mut store, 0, "p2").unwrap().counted());
        assert_eq!(engine.cast_vote(&mut store, 0, "p2").unwrap(), VoteOutcome::AlreadyVoted);
        assert_eq!(engine.cast_vote(&mut store, 0, "p1").unwrap(), VoteOutcome::CursorPast);
        assert_eq!(engine.cast_vote(&mut store, 0, "zz").unwrap_err(), VisError::UnknownTarget("zz".into()));
        assert!(matches!(engine.cast_vote(&mut store, 7, "p1"), Err(VisError::UnknownChain(_))));

        assert!(engine.finalize(&mut store, "p1").unwrap());
        assert!(!engine.finalize(&mut store, "p1").unwrap());
        assert_eq!(engine.cast_vote(&mut store, 1, "p1").unwrap(), VoteOutcome::AlreadyFinalized);
        assert_eq!(engine.snapshot().finalized, 1);
    }

    #[test]
    fn test_frontier_votes_in_index_order() {
        let (mut store, mut engine) = setup(1);
        let g = proposer_genesis_id();
        store.add_block(ChainRef::Proposer, "p1".into(), &g, None, vec![]).unwrap();
        store.add_block(ChainRef::Proposer, "p2".into(), "p1", None, vec![]).unwrap();
        store.add_block(ChainRef::Proposer, "p3".into(), "p2", None, vec![]).unwrap();
        engine.finalize(&mut store, "p2").unwrap();

        let out = engine.cast_votes_for_frontier_with(&mut store, 0, |b| !b.is_genesis()).unwrap();
        let ids: Vec<_> = out.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
        assert_eq!(engine.cursor(0), Some(3));
        assert!(engine.cast_votes_for_frontier(&mut store, 0).unwrap().is_empty());

        store.add_block(ChainRef::Proposer, "p4".into(), "p3", None, vec![]).unwrap();
        let out = engine.cast_votes_for_frontier(&mut store, 0).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "p4");
        assert_eq!(engine.pending_votes().len(), 3);
        assert_eq!(engine.pending_votes()[0].from_block, store.deepest_block(ChainRef::Voter(0)).unwrap().id);
    }

    #[test]
    fn test_eviction_drops_votes() {
        let (mut store, mut engine) = setup(2);
        store.add_block(ChainRef::Proposer, "p1".into(), &proposer_genesis_id(), None, vec![]).unwrap();
        engine.cast_vote(&mut store, 0, "p1").unwrap();
        engine.cast_vote(&mut store, 1, "p1").unwrap();
        assert_eq!(engine.on_evicted(ChainRef::Proposer, "p1"), 2);
        assert!(engine.pending_votes().is_empty());
        assert_eq!(engine.on_evicted(ChainRef::Voter(0), "v"), 0);
    }
}
