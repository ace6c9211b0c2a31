//! One chain's arena: live blocks by id, the active window in insertion order,
//! and tombstones for evicted ids.

use crate::blockstore::ancestors::Ancestors;
use crate::blockstore::types::{Block, BlockId, BlockStatus, ChainRef, OriginId, Tombstone};
use crate::consensus::types::Weight;
use crate::utils::errors::{Result, VisError};
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
pub struct Chain {
    chain: ChainRef,
    blocks: HashMap<BlockId, Block>,
    window: VecDeque<BlockId>,
    tombstones: HashMap<BlockId, Tombstone>,
    tombstone_order: VecDeque<BlockId>,
    tombstone_limit: usize,
    genesis: BlockId,
    next_index: u64,
}

impl Chain {
    pub fn with_genesis(chain: ChainRef, genesis: BlockId, base_weight: Weight, tombstone_limit: usize) -> Self {
        let block = Block {
            id: genesis.clone(),
            parent: None,
            depth: 0,
            origin: None,
            // the proposer genesis is confirmed by definition and never voted on
            finalized: chain.is_proposer(),
            finalization_weight: base_weight,
            refs: vec![],
            children: vec![],
            index: 0,
        };
        let mut blocks = HashMap::new();
        blocks.insert(genesis.clone(), block);
        Self {
            chain,
            blocks,
            window: VecDeque::from([genesis.clone()]),
            tombstones: HashMap::new(),
            tombstone_order: VecDeque::new(),
            tombstone_limit,
            genesis,
            next_index: 1,
        }
    }

    pub fn chain_ref(&self) -> ChainRef {
        self.chain
    }

    pub fn genesis_id(&self) -> &BlockId {
        &self.genesis
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn tombstone(&self, id: &str) -> Option<&Tombstone> {
        self.tombstones.get(id)
    }

    pub fn status(&self, id: &str) -> BlockStatus {
        if self.blocks.contains_key(id) {
            BlockStatus::Active
        } else if self.tombstones.contains_key(id) {
            BlockStatus::Evicted
        } else {
            BlockStatus::Unknown
        }
    }

    /// Number of active blocks.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Active blocks, oldest first.
    pub fn window(&self) -> impl DoubleEndedIterator<Item = &Block> + '_ {
        self.window.iter().filter_map(move |id| self.blocks.get(id))
    }

    pub fn oldest(&self) -> Option<&Block> {
        self.window.front().and_then(|id| self.blocks.get(id))
    }

    pub fn newest(&self) -> Option<&Block> {
        self.window.back().and_then(|id| self.blocks.get(id))
    }

    /// Deepest active block; among equals the most recently inserted one wins.
    pub fn deepest(&self) -> Option<&Block> {
        self.window().fold(None, |best: Option<&Block>, b| match best {
            Some(cur) if cur.depth > b.depth => Some(cur),
            _ => Some(b),
        })
    }

    pub fn ancestors(&self, id: &str) -> Ancestors<'_> {
        Ancestors::new(self, self.blocks.get(id))
    }

    /// Link a new block under `parent`. Returns the new block's depth.
    pub(crate) fn insert(
        &mut self,
        id: BlockId,
        parent: &str,
        origin: Option<OriginId>,
        refs: Vec<BlockId>,
        base_weight: Weight,
    ) -> Result<u64> {
        if self.blocks.contains_key(&id) || self.tombstones.contains_key(&id) {
            return Err(VisError::DuplicateBlock(id));
        }
        let forks_allowed = self.chain.is_proposer();

        let depth = if let Some(p) = self.blocks.get_mut(parent) {
            if !forks_allowed && !p.children.is_empty() {
                return Err(VisError::IllegalFork { chain: self.chain, parent: parent.to_string() });
            }
            p.children.push(id.clone());
            p.depth + 1
        } else if let Some(t) = self.tombstones.get_mut(parent) {
            if !forks_allowed && t.children > 0 {
                return Err(VisError::IllegalFork { chain: self.chain, parent: parent.to_string() });
            }
            t.children += 1;
            t.live_children += 1;
            t.depth + 1
        } else {
            return Err(VisError::UnknownParent { chain: self.chain, parent: parent.to_string() });
        };

        let index = self.next_index;
        self.next_index += 1;
        let block = Block {
            id: id.clone(),
            parent: Some(parent.to_string()),
            depth,
            origin,
            finalized: false,
            finalization_weight: base_weight,
            refs,
            children: vec![],
            index,
        };
        self.blocks.insert(id.clone(), block);
        self.window.push_back(id);
        Ok(depth)
    }

    /// Remove the oldest active block, leaving a tombstone. The newest block is never evicted.
    pub(crate) fn evict_oldest(&mut self) -> Option<Block> {
        if self.window.len() <= 1 {
            return None;
        }
        let id = self.window.pop_front()?;
        let block = self.blocks.remove(&id)?;
        if let Some(t) = block.parent.as_deref().and_then(|p| self.tombstones.get_mut(p)) {
            t.live_children = t.live_children.saturating_sub(1);
        }
        // children stay live; their parent id now resolves to the tombstone
        let live_children = block.children.iter().filter(|c| self.blocks.contains_key(c.as_str())).count();
        self.tombstones.insert(
            id.clone(),
            Tombstone { depth: block.depth, index: block.index, children: block.children.len(), live_children },
        );
        self.tombstone_order.push_back(id);
        self.recycle_tombstones();
        Some(block)
    }

    /// Drop the oldest tombstones over the limit, skipping any that still parent a live block.
    fn recycle_tombstones(&mut self) {
        let mut excess = self.tombstone_order.len().saturating_sub(self.tombstone_limit);
        if excess == 0 {
            return;
        }
        let tombstones = &mut self.tombstones;
        self.tombstone_order.retain(|id| {
            if excess == 0 {
                return true;
            }
            match tombstones.get(id) {
                Some(t) if t.live_children > 0 => true,
                _ => {
                    tombstones.remove(id);
                    excess -= 1;
                    false
                }
            }
        });
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstone_order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(kind: ChainRef) -> Chain {
        Chain::with_genesis(kind, "g".into(), Weight::from_fraction(0.3), 8)
    }

    #[test]
    fn test_depth_and_children() {
        let mut c = chain(ChainRef::Proposer);
        assert_eq!(c.insert("a".into(), "g", Some(1), vec![], Weight::ZERO).unwrap(), 1);
        assert_eq!(c.insert("b".into(), "a", None, vec![], Weight::ZERO).unwrap(), 2);
        assert_eq!(c.get("g").unwrap().children, vec!["a".to_string()]);
        assert_eq!(c.get("b").unwrap().index, 2);
        assert_eq!(c.newest().unwrap().id, "b");
    }

    #[test]
    fn test_voter_fork_rejected_even_under_tombstone() {
        let mut c = chain(ChainRef::Voter(0));
        c.insert("a".into(), "g", None, vec![], Weight::ZERO).unwrap();
        c.insert("b".into(), "a", None, vec![], Weight::ZERO).unwrap();
        // g and a go away; a keeps its child count in the tombstone
        c.evict_oldest().unwrap();
        c.evict_oldest().unwrap();
        assert_eq!(c.status("a"), BlockStatus::Evicted);
        let err = c.insert("x".into(), "a", None, vec![], Weight::ZERO).unwrap_err();
        assert!(matches!(err, VisError::IllegalFork { .. }));
    }

    #[test]
    fn test_proposer_child_of_tombstone() {
        let mut c = chain(ChainRef::Proposer);
        c.insert("a".into(), "g", None, vec![], Weight::ZERO).unwrap();
        c.evict_oldest().unwrap();
        assert_eq!(c.insert("a2".into(), "g", None, vec![], Weight::ZERO).unwrap(), 1);
        assert!(matches!(
            c.insert("g".into(), "a", None, vec![], Weight::ZERO),
            Err(VisError::DuplicateBlock(_))
        ));
    }

    #[test]
    fn test_newest_never_evicted() {
        let mut c = chain(ChainRef::Proposer);
        assert!(c.evict_oldest().is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_tombstones_are_bounded() {
        let mut c = Chain::with_genesis(ChainRef::Voter(3), "g".into(), Weight::ZERO, 2);
        let mut parent = "g".to_string();
        for i in 0..6 {
            let id = format!("v{}", i);
            c.insert(id.clone(), &parent, None, vec![], Weight::ZERO).unwrap();
            parent = id;
        }
        while c.evict_oldest().is_some() {}
        assert_eq!(c.tombstone_count(), 2);
        assert_eq!(c.status("g"), BlockStatus::Unknown);
        assert_eq!(c.status("v3"), BlockStatus::Evicted);
        // v4 still parents the live v5
        assert_eq!(c.tombstone("v4").unwrap().live_children, 1);
        assert_eq!(c.status("v5"), BlockStatus::Active);
    }

    #[test]
    fn test_tombstone_with_live_child_outlives_the_limit() {
        let mut c = Chain::with_genesis(ChainRef::Proposer, "g".into(), Weight::ZERO, 3);
        let mut parent = "g".to_string();
        for i in 1..=5 {
            let id = format!("p{}", i);
            c.insert(id.clone(), &parent, None, vec![], Weight::ZERO).unwrap();
            parent = id;
        }
        for _ in 0..3 {
            c.evict_oldest().unwrap();
        }
        assert_eq!(c.tombstone("g").unwrap().live_children, 0);

        // late fork under the evicted genesis
        assert_eq!(c.insert("x".into(), "g", None, vec![], Weight::ZERO).unwrap(), 1);
        assert_eq!(c.tombstone("g").unwrap().live_children, 1);
        while c.len() > 1 {
            c.evict_oldest().unwrap();
        }
        assert_eq!(c.newest().unwrap().id, "x");
        assert_eq!(c.tombstone_count(), 3);
        assert_eq!(c.status("g"), BlockStatus::Evicted);
        assert_eq!(c.status("p1"), BlockStatus::Unknown);
        assert_eq!(c.status("p2"), BlockStatus::Unknown);
        for block in c.window() {
            let parent = block.parent.as_deref().unwrap();
            assert!(c.get(parent).is_some() || c.tombstone(parent).is_some(), "{} lost its parent", block.id);
        }
    }

    #[test]
    fn test_deepest_tie_break_prefers_newer() {
        let mut c = chain(ChainRef::Proposer);
        c.insert("a".into(), "g", None, vec![], Weight::ZERO).unwrap();
        c.insert("b".into(), "g", None, vec![], Weight::ZERO).unwrap();
        assert_eq!(c.deepest().unwrap().id, "b");
        c.insert("c".into(), "a", None, vec![], Weight::ZERO).unwrap();
        c.insert("d".into(), "g", None, vec![], Weight::ZERO).unwrap();
        assert_eq!(c.deepest().unwrap().id, "c");
    }
}
