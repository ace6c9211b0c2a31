//! Block store: the proposer tree plus N voter chains, each an id-keyed arena.
//!
//! Public surface:
//! - BlockStore: add_block / deepest_block / ancestors_of / evict_oldest
//! - types, chain, ancestors

pub mod ancestors;
pub mod chain;
pub mod types;

use crate::blockstore::ancestors::Ancestors;
use crate::blockstore::chain::Chain;
use crate::blockstore::types::{Block, BlockId, BlockStatus, ChainRef, OriginId};
use crate::consensus::types::Weight;
use crate::utils::errors::{Result, VisError};
use tracing::debug;

/// Genesis id of the proposer tree: 64 zeros.
pub fn proposer_genesis_id() -> BlockId {
    format!("{:064x}", 0)
}

/// Genesis id of voter chain `i`: `i + 1` as 64-digit hex.
pub fn voter_genesis_id(chain: u16) -> BlockId {
    format!("{:064x}", chain as u64 + 1)
}

#[derive(Debug)]
pub struct BlockStore {
    proposer: Chain,
    voters: Vec<Chain>,
    base_weight: Weight,
}

impl BlockStore {
    pub fn new(voter_chains: u16, base_weight: Weight, tombstone_limit: usize) -> Self {
        let proposer = Chain::with_genesis(ChainRef::Proposer, proposer_genesis_id(), base_weight, tombstone_limit);
        let voters = (0..voter_chains)
            .map(|i| Chain::with_genesis(ChainRef::Voter(i), voter_genesis_id(i), base_weight, tombstone_limit))
            .collect();
        Self { proposer, voters, base_weight }
    }

    pub fn voter_chain_count(&self) -> u16 {
        self.voters.len() as u16
    }

    pub fn base_weight(&self) -> Weight {
        self.base_weight
    }

    pub fn chain(&self, chain: ChainRef) -> Result<&Chain> {
        match chain {
            ChainRef::Proposer => Ok(&self.proposer),
            ChainRef::Voter(i) => self.voters.get(i as usize).ok_or(VisError::UnknownChain(chain)),
        }
    }

    pub(crate) fn chain_mut(&mut self, chain: ChainRef) -> Result<&mut Chain> {
        match chain {
            ChainRef::Proposer => Ok(&mut self.proposer),
            ChainRef::Voter(i) => self.voters.get_mut(i as usize).ok_or(VisError::UnknownChain(chain)),
        }
    }

    pub fn proposer(&self) -> &Chain {
        &self.proposer
    }

    pub fn voters(&self) -> impl Iterator<Item = &Chain> + '_ {
        self.voters.iter()
    }

    pub fn get(&self, chain: ChainRef, id: &str) -> Option<&Block> {
        self.chain(chain).ok().and_then(|c| c.get(id))
    }

    pub fn status(&self, chain: ChainRef, id: &str) -> BlockStatus {
        self.chain(chain).map(|c| c.status(id)).unwrap_or(BlockStatus::Unknown)
    }

    /// Link `id` under `parent` on `chain` and return its depth.
    ///
    /// Voter blocks never carry transaction refs; any given are dropped.
    pub fn add_block(
        &mut self,
        chain: ChainRef,
        id: BlockId,
        parent: &str,
        origin: Option<OriginId>,
        refs: Vec<BlockId>,
    ) -> Result<u64> {
        let base = self.base_weight;
        let refs = if chain.is_proposer() { refs } else { Vec::new() };
        let target = self.chain_mut(chain)?;
        let depth = target.insert(id, parent, origin, refs, base)?;
        debug!(%chain, parent, depth, "block linked");
        Ok(depth)
    }

    pub fn deepest_block(&self, chain: ChainRef) -> Result<&Block> {
        self.chain(chain)?.deepest().ok_or(VisError::UnknownChain(chain))
    }

    pub fn ancestors_of(&self, chain: ChainRef, id: &str) -> Result<Ancestors<'_>> {
        Ok(self.chain(chain)?.ancestors(id))
    }

    pub(crate) fn evict_oldest(&mut self, chain: ChainRef) -> Result<Option<Block>> {
        Ok(self.chain_mut(chain)?.evict_oldest())
    }
}
