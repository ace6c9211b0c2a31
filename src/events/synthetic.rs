//! Synthetic block production.
//!
//! Every participant mines on its own exponential clock. A mined block is
//! announced to the visualizer at once and reaches the other participants
//! after a fixed propagation delay, so participants that have not heard of it
//! yet can mine competing blocks on the same parent: proposer forks, or voter
//! blocks the store will refuse.

use crate::blockstore::types::{BlockId, ChainRef, OriginId};
use crate::blockstore::{proposer_genesis_id, voter_genesis_id};
use crate::consensus::types::block_hash;
use crate::events::scheduler::{Scheduler, TimerHandle};
use crate::events::{EventSource, VisEvent};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Known-but-unreferenced transaction blocks a participant remembers.
const KNOWN_TX_LIMIT: usize = 1024;

/// Mining delays past this are treated as never.
const MAX_TIMER_DELAY: Duration = Duration::from_secs(u32::MAX as u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub participants: u32,
    /// network-wide blocks per second, per kind
    pub transaction_rate: f64,
    pub proposer_rate: f64,
    pub voter_rate: f64,
    pub propagation_delay_ms: u64,
    /// pause between a voter block and the votes it casts
    pub vote_delay_ms: u64,
    pub max_refs: usize,
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            participants: 10,
            transaction_rate: 5.0,
            proposer_rate: 0.2,
            voter_rate: 20.0,
            propagation_delay_ms: 500,
            vote_delay_ms: 250,
            max_refs: 64,
            seed: None,
        }
    }
}

impl SyntheticConfig {
    fn total_rate(&self) -> f64 {
        self.transaction_rate + self.proposer_rate + self.voter_rate
    }
}

#[derive(Debug, Clone)]
enum MinedBlock {
    Transaction { id: BlockId },
    Proposer { id: BlockId, depth: u64, refs: Vec<BlockId> },
    Voter { chain: u16, id: BlockId, depth: u64 },
}

impl MinedBlock {
    fn id(&self) -> &BlockId {
        match self {
            MinedBlock::Transaction { id } | MinedBlock::Proposer { id, .. } | MinedBlock::Voter { id, .. } => id,
        }
    }
}

#[derive(Debug)]
enum Timer {
    Mine(OriginId),
    Deliver { from: OriginId, block: MinedBlock },
    CastVotes { chain: u16, block: BlockId },
}

/// One participant's local view of the network.
#[derive(Debug)]
struct Participant {
    id: OriginId,
    proposer_tip: (BlockId, u64),
    voter_tips: Vec<(BlockId, u64)>,
    known_tx: VecDeque<BlockId>,
    mine_timer: Option<TimerHandle>,
}

impl Participant {
    fn new(id: OriginId, voter_chains: u16) -> Self {
        Self {
            id,
            proposer_tip: (proposer_genesis_id(), 0),
            voter_tips: (0..voter_chains).map(|c| (voter_genesis_id(c), 0)).collect(),
            known_tx: VecDeque::new(),
            mine_timer: None,
        }
    }

    fn learn(&mut self, block: &MinedBlock) {
        match block {
            MinedBlock::Transaction { id } => {
                self.known_tx.push_back(id.clone());
                if self.known_tx.len() > KNOWN_TX_LIMIT {
                    self.known_tx.pop_front();
                }
            }
            MinedBlock::Proposer { id, depth, refs } => {
                if *depth > self.proposer_tip.1 {
                    self.proposer_tip = (id.clone(), *depth);
                }
                let referenced: HashSet<&BlockId> = refs.iter().collect();
                self.known_tx.retain(|t| !referenced.contains(t));
            }
            MinedBlock::Voter { chain, id, depth } => {
                if let Some(tip) = self.voter_tips.get_mut(*chain as usize) {
                    if *depth > tip.1 {
                        *tip = (id.clone(), *depth);
                    }
                }
            }
        }
    }
}

pub struct SyntheticGenerator {
    config: SyntheticConfig,
    scheduler: Scheduler<Timer>,
    participants: Vec<Participant>,
    /// accepted head of every voter chain; a voter block is accepted only on top of it
    voter_heads: Vec<BlockId>,
    /// pending propagation timers by block
    deliveries: HashMap<BlockId, TimerHandle>,
    /// pending vote-pass timers by the voter block that triggers them
    vote_passes: HashMap<BlockId, TimerHandle>,
    rng: StdRng,
    minted: u64,
    started: Option<tokio::time::Instant>,
    finished: bool,
}

impl SyntheticGenerator {
    pub fn new(config: SyntheticConfig, voter_chains: u16) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let participants = (0..config.participants).map(|id| Participant::new(id, voter_chains)).collect();
        let mut gen = Self {
            config,
            scheduler: Scheduler::new(),
            participants,
            voter_heads: (0..voter_chains).map(voter_genesis_id).collect(),
            deliveries: HashMap::new(),
            vote_passes: HashMap::new(),
            rng,
            minted: 0,
            started: None,
            finished: false,
        };
        for p in 0..gen.participants.len() {
            gen.schedule_mining(p as OriginId);
        }
        gen
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Exponentially distributed delay, or `None` when it would never fire.
    fn exp_delay(&mut self, rate: f64) -> Option<Duration> {
        if rate <= 0.0 {
            return None;
        }
        let u: f64 = self.rng.gen();
        Duration::try_from_secs_f64(-(1.0 - u).ln() / rate).ok().filter(|d| *d <= MAX_TIMER_DELAY)
    }

    fn schedule_mining(&mut self, participant: OriginId) {
        let rate = self.config.total_rate() / self.config.participants.max(1) as f64;
        let Some(delay) = self.exp_delay(rate) else {
            debug!(participant, rate, "mining clock never fires");
            return;
        };
        let handle = self.scheduler.schedule(delay, Timer::Mine(participant));
        if let Some(p) = self.participants.get_mut(participant as usize) {
            p.mine_timer = Some(handle);
        }
    }

    /// Stop a participant's mining clock. Returns false if it was not running.
    pub fn stop_participant(&mut self, participant: OriginId) -> bool {
        let handle = self.participants.get_mut(participant as usize).and_then(|p| p.mine_timer.take());
        match handle {
            Some(h) => self.scheduler.cancel(h),
            None => false,
        }
    }

    /// Cancel the propagation of `block` to the other participants.
    /// Returns false if it already arrived or was cancelled.
    pub fn cancel_delivery(&mut self, block: &str) -> bool {
        match self.deliveries.remove(block) {
            Some(h) => self.scheduler.cancel(h),
            None => false,
        }
    }

    /// Cancel the vote pass scheduled after voter block `block`.
    pub fn cancel_vote_pass(&mut self, block: &str) -> bool {
        match self.vote_passes.remove(block) {
            Some(h) => self.scheduler.cancel(h),
            None => false,
        }
    }

    /// Cancel every pending timer; `next_batch` returns `None` afterwards.
    pub fn shutdown(&mut self) {
        self.scheduler.clear();
        self.deliveries.clear();
        self.vote_passes.clear();
        for p in &mut self.participants {
            p.mine_timer = None;
        }
        self.finished = true;
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    fn next_id(&mut self, kind: &str, miner: OriginId, parent: &str) -> BlockId {
        self.minted += 1;
        block_hash(format!("{}:{}:{}:{}", kind, miner, self.minted, parent).as_bytes())
    }

    /// Fire every timer due at or before `until` and return the events they produced.
    pub fn step_until(&mut self, until: Duration) -> Vec<VisEvent> {
        let mut events = vec![];
        while let Some(timer) = self.scheduler.pop_due(until) {
            match timer {
                Timer::Mine(p) => {
                    if let Some(p_ref) = self.participants.get_mut(p as usize) {
                        p_ref.mine_timer = None;
                    }
                    self.mine(p, &mut events);
                    self.schedule_mining(p);
                }
                Timer::Deliver { from, block } => {
                    self.deliveries.remove(block.id());
                    for p in self.participants.iter_mut().filter(|p| p.id != from) {
                        p.learn(&block);
                    }
                }
                Timer::CastVotes { chain, block } => {
                    self.vote_passes.remove(&block);
                    events.push(VisEvent::CastVotesForFrontier { chain });
                }
            }
        }
        self.scheduler.advance_to(until);
        events
    }

    fn mine(&mut self, miner: OriginId, events: &mut Vec<VisEvent>) {
        let Some(view) = self.participants.get(miner as usize) else {
            return;
        };
        let proposer_tip = view.proposer_tip.clone();
        let voter_tips_len = view.voter_tips.len();
        let total = self.config.total_rate();
        let draw = self.rng.gen::<f64>() * total;

        let block = if draw < self.config.transaction_rate {
            let id = self.next_id("tx", miner, &proposer_tip.0);
            events.push(VisEvent::AddTransactionBlock { id: id.clone(), origin: Some(miner) });
            MinedBlock::Transaction { id }
        } else if draw < self.config.transaction_rate + self.config.proposer_rate || voter_tips_len == 0 {
            let refs: Vec<BlockId> = self
                .participants
                .get(miner as usize)
                .map(|v| v.known_tx.iter().take(self.config.max_refs).cloned().collect())
                .unwrap_or_default();
            let id = self.next_id("proposer", miner, &proposer_tip.0);
            events.push(VisEvent::AddBlock {
                chain: ChainRef::Proposer,
                id: id.clone(),
                parent: proposer_tip.0.clone(),
                origin: Some(miner),
                refs: refs.clone(),
            });
            MinedBlock::Proposer { id, depth: proposer_tip.1 + 1, refs }
        } else {
            let chain = self.rng.gen_range(0..voter_tips_len) as u16;
            let (parent, depth) = match self.participants.get(miner as usize) {
                Some(v) => v.voter_tips[chain as usize].clone(),
                None => return,
            };
            let id = self.next_id("voter", miner, &parent);
            events.push(VisEvent::AddBlock {
                chain: ChainRef::Voter(chain),
                id: id.clone(),
                parent: parent.clone(),
                origin: Some(miner),
                refs: vec![],
            });
            if self.voter_heads[chain as usize] != parent {
                // lost the race; the store will refuse it and nobody builds on it
                debug!(miner, chain, "voter block mined on a stale tip");
                return;
            }
            self.voter_heads[chain as usize] = id.clone();
            let pass = self
                .scheduler
                .schedule(Duration::from_millis(self.config.vote_delay_ms), Timer::CastVotes { chain, block: id.clone() });
            self.vote_passes.insert(id.clone(), pass);
            MinedBlock::Voter { chain, id, depth: depth + 1 }
        };

        if let Some(view) = self.participants.get_mut(miner as usize) {
            view.learn(&block);
        }
        let id = block.id().clone();
        let delivery = self.scheduler.schedule(
            Duration::from_millis(self.config.propagation_delay_ms),
            Timer::Deliver { from: miner, block },
        );
        self.deliveries.insert(id, delivery);
    }
}

#[async_trait]
impl EventSource for SyntheticGenerator {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn next_batch(&mut self) -> Option<Vec<VisEvent>> {
        let started = match self.started {
            Some(t) => t,
            None => {
                info!(participants = self.config.participants, "synthetic generator started");
                let t = tokio::time::Instant::now();
                self.started = Some(t);
                t
            }
        };
        loop {
            if self.finished {
                return None;
            }
            let deadline = self.scheduler.next_deadline()?;
            let Some(at) = started.checked_add(deadline) else {
                warn!(?deadline, "timer beyond the clock range, stopping");
                self.finished = true;
                return None;
            };
            tokio::time::sleep_until(at).await;
            let batch = self.step_until(deadline);
            if !batch.is_empty() {
                return Some(batch);
            }
        }
    }
}
