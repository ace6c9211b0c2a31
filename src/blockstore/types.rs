use crate::consensus::types::Weight;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque block identifier, unique within its chain namespace.
pub type BlockId = String;

/// Network participant that produced a block.
pub type OriginId = u32;

/// Which chain a block lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainRef {
    Proposer,
    Voter(u16),
}

impl ChainRef {
    pub fn is_proposer(&self) -> bool {
        matches!(self, ChainRef::Proposer)
    }
}

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRef::Proposer => write!(f, "proposer"),
            ChainRef::Voter(idx) => write!(f, "voter#{}", idx),
        }
    }
}

/// Where an id stands in a chain's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Active,
    Evicted,
    Unknown,
}

/// A block record owned by its chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    /// `None` only for genesis.
    pub parent: Option<BlockId>,
    pub depth: u64,
    pub origin: Option<OriginId>,
    pub finalized: bool,
    pub finalization_weight: Weight,
    /// Referenced transaction-block ids; always empty on voter chains.
    pub refs: Vec<BlockId>,
    pub children: Vec<BlockId>,
    /// Insertion index within the chain. Voter cursors are expressed in proposer indices.
    pub index: u64,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.parent.is_none()
    }
}

/// What is left of a block after eviction: enough to link late children and reject re-delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tombstone {
    pub depth: u64,
    pub index: u64,
    /// every child ever linked, live or not
    pub children: usize,
    /// children still in the active window; a tombstone is only recycled at zero
    pub live_children: usize,
}
