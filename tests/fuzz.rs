//! Randomized runs with seeded rngs; every step is checked against the
//! structural invariants of the store, the votes and the ledger.

use prismvis::blockstore::types::{BlockStatus, ChainRef};
use prismvis::blockstore::{proposer_genesis_id, voter_genesis_id};
use prismvis::consensus::types::{FinalityConfig, Weight};
use prismvis::events::{SyntheticConfig, SyntheticGenerator, VisEvent};
use prismvis::visualizer::{EventQueue, Visualizer, VisualizerParams};
use prismvis::window::WindowPolicy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const VOTER_CHAINS: u16 = 6;

fn params() -> VisualizerParams {
    VisualizerParams {
        voter_chains: VOTER_CHAINS,
        finality: FinalityConfig::default(),
        proposer_window: WindowPolicy { capacity: 12, span: 8 },
        voter_window: WindowPolicy { capacity: 6, span: 4 },
        pool_capacity: 40,
        tombstone_limit: 32,
    }
}

/// What earlier steps observed; every check compares against it.
#[derive(Default)]
struct History {
    finalized_seen: HashSet<String>,
    cursors: Vec<Option<u64>>,
    weights: HashMap<String, Weight>,
}

fn check_invariants(vis: &Visualizer, history: &mut History) {
    let store = vis.store();
    let mut chains = vec![ChainRef::Proposer];
    chains.extend((0..store.voter_chain_count()).map(ChainRef::Voter));

    for chain_ref in chains {
        let chain = store.chain(chain_ref).unwrap();
        let policy = vis.windows().policy(chain_ref);
        assert!(chain.len() >= 1, "{} lost its newest block", chain_ref);
        assert!(chain.len() <= policy.capacity, "{} window over capacity", chain_ref);

        for block in chain.window() {
            if let Some(parent) = &block.parent {
                let parent_depth = chain
                    .get(parent)
                    .map(|p| p.depth)
                    .or_else(|| chain.tombstone(parent).map(|t| t.depth))
                    .expect("parent is live or tombstoned");
                assert_eq!(block.depth, parent_depth + 1);
            }
            if !chain_ref.is_proposer() {
                assert!(block.children.len() <= 1, "voter chain forked at {}", block.id);
            }
        }
    }

    // voter cursors only move forward
    let cursors = vis.engine().snapshot().cursors;
    for (c, (before, now)) in history.cursors.iter().zip(&cursors).enumerate() {
        assert!(now >= before, "cursor of voter chain {} went back", c);
    }
    history.cursors = cursors;

    // weight of an unfinalized block only grows
    let mut weights = HashMap::new();
    for block in store.proposer().window() {
        if let Some(before) = history.weights.get(&block.id) {
            assert!(block.finalization_weight >= *before, "{} lost weight", block.id);
        }
        if !block.finalized {
            weights.insert(block.id.clone(), block.finalization_weight);
        }
    }
    history.weights = weights;

    // finalization never reverts while a block is active
    let finalized_seen = &mut history.finalized_seen;
    for id in finalized_seen.iter() {
        if let Some(block) = store.get(ChainRef::Proposer, id) {
            assert!(block.finalized, "{} lost finality", id);
        }
    }
    for block in store.proposer().window().filter(|b| b.finalized) {
        finalized_seen.insert(block.id.clone());
    }

    let mut pairs = HashSet::new();
    for vote in vis.pending_votes() {
        assert!(pairs.insert((vote.voter_chain, vote.target.clone())), "double vote");
        let target = store.get(ChainRef::Proposer, &vote.target).expect("live vote targets an active block");
        assert!(!target.finalized);
    }

    let ledger = vis.ledger(0, usize::MAX);
    let captured: HashSet<&str> = ledger.iter().map(|e| e.transaction_block.as_str()).collect();
    assert_eq!(captured.len(), ledger.len(), "ledger repeats an entry");
    for (i, entry) in ledger.iter().enumerate() {
        assert_eq!(entry.position, i as u64);
    }
    for pending in vis.transaction_pool() {
        assert!(!captured.contains(pending.id.as_str()), "{} both pending and captured", pending.id);
    }
}

fn random_event(rng: &mut StdRng, proposers: &mut Vec<String>, voters: &mut [Vec<String>], txs: &mut Vec<String>, n: usize) -> VisEvent {
    match rng.gen_range(0..100) {
        0..=24 => {
            let id = format!("tx{}", n);
            txs.push(id.clone());
            VisEvent::AddTransactionBlock { id, origin: Some(rng.gen_range(0..4)) }
        }
        25..=44 => {
            let parent = proposers[proposers.len().saturating_sub(rng.gen_range(1..4)).min(proposers.len() - 1)].clone();
            let id = format!("p{}", n);
            proposers.push(id.clone());
            let k = rng.gen_range(0..4);
            let refs = txs.choose_multiple(rng, k).cloned().collect();
            VisEvent::AddBlock { chain: ChainRef::Proposer, id, parent, origin: None, refs }
        }
        45..=74 => {
            let c = rng.gen_range(0..VOTER_CHAINS);
            let known = &mut voters[c as usize];
            // mostly extend the head, sometimes try to fork
            let parent = if rng.gen_bool(0.85) {
                known[known.len() - 1].clone()
            } else {
                known[rng.gen_range(0..known.len())].clone()
            };
            let id = format!("v{}-{}", c, n);
            known.push(id.clone());
            VisEvent::AddBlock { chain: ChainRef::Voter(c), id, parent, origin: None, refs: vec![] }
        }
        75..=92 => VisEvent::CastVotesForFrontier { chain: rng.gen_range(0..VOTER_CHAINS) },
        93..=96 => {
            let ids = proposers.choose_multiple(rng, 2).cloned().collect();
            VisEvent::ConfirmBlocks { ids }
        }
        _ => {
            // redelivery of something already seen
            let id = proposers.choose(rng).cloned().unwrap_or_default();
            VisEvent::AddBlock { chain: ChainRef::Proposer, id, parent: proposer_genesis_id(), origin: None, refs: vec![] }
        }
    }
}

#[test]
fn fuzz_random_event_streams() {
    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut vis = Visualizer::new(params());
        let mut queue = EventQueue::new();
        let mut history = History::default();

        let mut proposers = vec![proposer_genesis_id()];
        let mut voters: Vec<Vec<String>> = (0..VOTER_CHAINS).map(|c| vec![voter_genesis_id(c)]).collect();
        let mut txs = vec![];

        for n in 0..1500 {
            queue.push(random_event(&mut rng, &mut proposers, &mut voters, &mut txs, n));
            queue.drain_into(&mut vis);
            if n % 7 == 0 {
                queue.tick();
                queue.drain_into(&mut vis);
            }
            check_invariants(&vis, &mut history);
        }
        queue.tick();
        queue.drain_into(&mut vis);
        assert!(queue.is_idle());
        check_invariants(&vis, &mut history);
    }
}

#[test]
fn fuzz_duplicates_never_change_state() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut vis = Visualizer::new(params());
    let mut proposers = vec![proposer_genesis_id()];
    let mut voters: Vec<Vec<String>> = (0..VOTER_CHAINS).map(|c| vec![voter_genesis_id(c)]).collect();
    let mut txs = vec![];
    let mut applied = vec![];

    for n in 0..300 {
        let event = random_event(&mut rng, &mut proposers, &mut voters, &mut txs, n);
        if matches!(event, VisEvent::AddBlock { .. }) && vis.apply(event.clone()).is_ok() {
            applied.push(event);
        }
    }
    let window = vis.active_window(ChainRef::Proposer).unwrap();
    let ledger = vis.ledger(0, usize::MAX);

    for event in applied {
        let VisEvent::AddBlock { chain, id, .. } = &event else { continue };
        let before = vis.store().status(*chain, id);
        if before == BlockStatus::Unknown {
            // tombstone already recycled
            continue;
        }
        assert!(vis.apply(event.clone()).is_err());
        assert_eq!(vis.store().status(*chain, id), before);
    }
    assert_eq!(vis.active_window(ChainRef::Proposer).unwrap(), window);
    assert_eq!(vis.ledger(0, usize::MAX), ledger);
}

#[test]
fn fuzz_synthetic_network() {
    let config = SyntheticConfig { seed: Some(7), ..SyntheticConfig::default() };
    let mut gen = SyntheticGenerator::new(config, 10);
    let mut vis = Visualizer::new(VisualizerParams { voter_chains: 10, ..params() });
    let mut queue = EventQueue::new();
    let mut history = History::default();

    for step in 1..=600u64 {
        queue.extend(gen.step_until(Duration::from_millis(step * 100)));
        queue.drain_into(&mut vis);
        queue.tick();
        queue.drain_into(&mut vis);
        check_invariants(&vis, &mut history);
    }
    assert!(vis.store().proposer().newest().unwrap().depth > 0);
    assert!(vis.store().voters().all(|c| c.newest().map_or(false, |b| b.depth > 0)));
}
