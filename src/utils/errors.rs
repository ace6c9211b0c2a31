use crate::blockstore::types::{BlockId, ChainRef};
use thiserror::Error;

/// Unified error type for the block-tree core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisError {
    #[error("duplicate block {0}")]
    DuplicateBlock(BlockId),

    #[error("unknown parent {parent} on {chain}")]
    UnknownParent { chain: ChainRef, parent: BlockId },

    #[error("illegal fork under {parent} on {chain}")]
    IllegalFork { chain: ChainRef, parent: BlockId },

    #[error("unknown vote target {0}")]
    UnknownTarget(BlockId),

    #[error("unknown chain {0}")]
    UnknownChain(ChainRef),

    #[error("transaction pool full")]
    PoolFull,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("config error: {0}")]
    Config(String),
}

impl VisError {
    /// Errors that are expected under at-least-once delivery and carry no signal.
    pub fn is_benign(&self) -> bool {
        matches!(self, VisError::DuplicateBlock(_) | VisError::UnknownTarget(_))
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, VisError>;
