//! prismvis: block-tree and finalization core for visualizing Prism consensus.
//!
//! Modules:
//! - blockstore: proposer tree and voter chains, arena addressed by id
//! - consensus: vote weighting and finalization
//! - txpool / ledger: pending transaction blocks and the confirmed ledger
//! - window: bounded active windows with tombstoned eviction
//! - events: synthetic generator, external feed, scheduler
//! - visualizer: the single-writer state machine and its read-only queries
//! - node / rpc: runtime wiring, CLI, JSON-RPC query server

pub mod blockstore;
pub mod consensus;
pub mod events;
pub mod ledger;
pub mod node;
pub mod rpc;
pub mod txpool;
pub mod utils;
pub mod visualizer;
pub mod window;
