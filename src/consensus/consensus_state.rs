//! ConsensusState keeps vote bookkeeping: live votes, the (chain, target) pairs
//! already voted, and each voter chain's cursor.

use crate::blockstore::types::BlockId;
use crate::consensus::types::Vote;
use serde::Serialize;
use std::collections::HashSet;

/// Snapshot representation for RPC/debugging
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusSnapshot {
    pub live_votes: usize,
    pub recorded_pairs: usize,
    pub finalized: u64,
    pub cursors: Vec<Option<u64>>,
}

#[derive(Debug)]
pub struct ConsensusState {
    /// votes whose target is neither finalized nor evicted
    live: Vec<Vote>,
    voted: HashSet<(u16, BlockId)>,
    /// highest proposer index each voter chain has voted on
    cursors: Vec<Option<u64>>,
    finalized: u64,
}

impl ConsensusState {
    pub fn new(voter_chains: u16) -> Self {
        Self {
            live: vec![],
            voted: HashSet::new(),
            cursors: vec![None; voter_chains as usize],
            finalized: 0,
        }
    }

    pub fn has_voted(&self, chain: u16, target: &str) -> bool {
        self.voted.contains(&(chain, target.to_string()))
    }

    /// record_vote returns false if the pair was already recorded.
    pub fn record_vote(&mut self, vote: Vote, live: bool) -> bool {
        if !self.voted.insert((vote.voter_chain, vote.target.clone())) {
            return false;
        }
        if live {
            self.live.push(vote);
        }
        true
    }

    pub fn cursor(&self, chain: u16) -> Option<u64> {
        self.cursors.get(chain as usize).copied().flatten()
    }

    /// Cursor only moves forward; a lower index is ignored.
    pub fn advance_cursor(&mut self, chain: u16, index: u64) {
        if let Some(c) = self.cursors.get_mut(chain as usize) {
            if c.map_or(true, |cur| index > cur) {
                *c = Some(index);
            }
        }
    }

    /// Drop live votes for a target that just finalized. Voted pairs stay recorded.
    pub fn drop_live_votes_for(&mut self, target: &str) -> usize {
        let before = self.live.len();
        self.live.retain(|v| v.target != target);
        before - self.live.len()
    }

    /// Forget everything about an evicted target.
    pub fn forget_target(&mut self, target: &str) -> usize {
        let dropped = self.drop_live_votes_for(target);
        self.voted.retain(|(_, t)| t != target);
        dropped
    }

    pub fn mark_finalized(&mut self) {
        self.finalized += 1;
    }

    pub fn live_votes(&self) -> &[Vote] {
        &self.live
    }

    pub fn snapshot(&self) -> ConsensusSnapshot {
        ConsensusSnapshot {
            live_votes: self.live.len(),
            recorded_pairs: self.voted.len(),
            finalized: self.finalized,
            cursors: self.cursors.clone(),
        }
    }
}
