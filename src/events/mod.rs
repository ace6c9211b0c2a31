//! Event sources: a synthetic generator and an external JSON feed, both
//! normalized into `VisEvent` batches.
//!
//! Public surface:
//! - VisEvent: the closed set of events the visualizer core applies
//! - EventSource: async producer of event batches
//! - scheduler, synthetic, message, codec, feed

pub mod codec;
pub mod feed;
pub mod message;
pub mod scheduler;
pub mod synthetic;

use crate::blockstore::types::{BlockId, ChainRef, OriginId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use feed::ExternalFeed;
pub use scheduler::{Scheduler, TimerHandle};
pub use synthetic::{SyntheticConfig, SyntheticGenerator};

/// Normalized event applied to the core state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisEvent {
    AddBlock {
        chain: ChainRef,
        id: BlockId,
        parent: BlockId,
        origin: Option<OriginId>,
        refs: Vec<BlockId>,
    },
    /// A voter chain's frontier moved; vote for everything it now covers.
    CastVotesForFrontier { chain: u16 },
    AddTransactionBlock { id: BlockId, origin: Option<OriginId> },
    /// Proposer blocks confirmed by an outside authority.
    ConfirmBlocks { ids: Vec<BlockId> },
    /// Pull a proposer block's refs into the ledger.
    CaptureConfirmed { id: BlockId },
}

impl VisEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            VisEvent::AddBlock { .. } => "add_block",
            VisEvent::CastVotesForFrontier { .. } => "cast_votes_for_frontier",
            VisEvent::AddTransactionBlock { .. } => "add_transaction_block",
            VisEvent::ConfirmBlocks { .. } => "confirm_blocks",
            VisEvent::CaptureConfirmed { .. } => "capture_confirmed",
        }
    }
}

/// Producer of event batches. `None` means the source is finished.
///
/// `next_batch` must be cancel-safe: the event loop drops it on shutdown.
#[async_trait]
pub trait EventSource: Send {
    fn name(&self) -> &'static str;

    async fn next_batch(&mut self) -> Option<Vec<VisEvent>>;
}
