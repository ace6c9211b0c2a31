use crate::blockstore::types::{BlockId, ChainRef, OriginId};
use crate::events::VisEvent;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Feed messages as the Prism node dumps them: externally tagged JSON,
/// one document per message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    ProposerBlock(ProposerBlockMsg),
    VoterBlock(VoterBlockMsg),
    TransactionBlock(TransactionBlockMsg),
    UpdatedLedger(UpdatedLedgerMsg),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProposerBlockMsg {
    pub id: BlockId,
    /// proposer parent
    pub parent: BlockId,
    #[serde(default)]
    pub transaction_refs: Vec<BlockId>,
    #[serde(default)]
    pub proposer_refs: Vec<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miner: Option<OriginId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VoterBlockMsg {
    pub id: BlockId,
    /// proposer parent, not used for linking
    pub parent: BlockId,
    pub chain: u16,
    pub voter_parent: BlockId,
    #[serde(default)]
    pub votes: Vec<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miner: Option<OriginId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TransactionBlockMsg {
    pub id: BlockId,
    pub parent: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miner: Option<OriginId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UpdatedLedgerMsg {
    #[serde(default)]
    pub added: Vec<BlockId>,
    #[serde(default)]
    pub removed: Vec<BlockId>,
}

impl FeedMessage {
    pub fn into_events(self) -> Vec<VisEvent> {
        match self {
            FeedMessage::ProposerBlock(m) => vec![VisEvent::AddBlock {
                chain: ChainRef::Proposer,
                id: m.id,
                parent: m.parent,
                origin: m.miner,
                refs: m.transaction_refs,
            }],
            FeedMessage::VoterBlock(m) => {
                // votes are recomputed from the frontier, the listed ones are informational;
                // the pass is a no-op unless the append is accepted
                vec![
                    VisEvent::AddBlock {
                        chain: ChainRef::Voter(m.chain),
                        id: m.id,
                        parent: m.voter_parent,
                        origin: m.miner,
                        refs: vec![],
                    },
                    VisEvent::CastVotesForFrontier { chain: m.chain },
                ]
            }
            FeedMessage::TransactionBlock(m) => vec![VisEvent::AddTransactionBlock { id: m.id, origin: m.miner }],
            FeedMessage::UpdatedLedger(m) => {
                if !m.removed.is_empty() {
                    // finalization is monotonic; rollbacks are not replayed
                    debug!(removed = m.removed.len(), "ignoring ledger removals");
                }
                if m.added.is_empty() {
                    vec![]
                } else {
                    vec![VisEvent::ConfirmBlocks { ids: m.added }]
                }
            }
        }
    }
}
