use crate::blockstore::types::BlockId;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Finalization weight in fixed point, 1 unit = 1/10000.
///
/// Increments add exactly: 0.3 plus five votes of 0.01 is 0.35, not above it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Weight(u64);

impl Weight {
    pub const SCALE: u64 = 10_000;
    pub const ZERO: Weight = Weight(0);

    pub fn from_units(units: u64) -> Self {
        Weight(units)
    }

    /// Rounds to the nearest unit; negative input clamps to zero.
    pub fn from_fraction(v: f64) -> Self {
        if v.is_nan() || v <= 0.0 {
            return Weight(0);
        }
        Weight((v * Self::SCALE as f64).round() as u64)
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn as_fraction(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn saturating_add(self, other: Weight) -> Weight {
        Weight(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.as_fraction())
    }
}

impl Serialize for Weight {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.as_fraction())
    }
}

/// A live vote from a voter chain for a proposer block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub voter_chain: u16,
    /// Voter block whose frontier advance produced the vote.
    pub from_block: BlockId,
    pub target: BlockId,
    pub increment: Weight,
}

/// Result of a single `cast_vote` call. Everything except `Counted` is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Counted { weight: Weight, crossed: bool },
    AlreadyFinalized,
    AlreadyVoted,
    CursorPast,
    TargetEvicted,
}

impl VoteOutcome {
    pub fn counted(&self) -> bool {
        matches!(self, VoteOutcome::Counted { .. })
    }

    /// True only on the call that pushed the weight over the threshold.
    pub fn crossed(&self) -> bool {
        matches!(self, VoteOutcome::Counted { crossed: true, .. })
    }
}

/// Finality parameters; finalization fires when weight is strictly above `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalityConfig {
    pub base_weight: Weight,
    pub vote_increment: Weight,
    pub threshold: Weight,
}

impl Default for FinalityConfig {
    fn default() -> Self {
        Self {
            base_weight: Weight::from_fraction(0.3),
            vote_increment: Weight::from_fraction(0.01),
            threshold: Weight::from_fraction(0.35),
        }
    }
}

/// hex-encoded sha256 of `bytes`, the shape block ids take on the wire
pub fn block_hash(bytes: &[u8]) -> BlockId {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
