use crate::blockstore::types::BlockId;
use serde::Serialize;
use std::collections::HashSet;

/// One confirmed transaction block, in confirmation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub position: u64,
    pub transaction_block: BlockId,
    pub confirmed_by: BlockId,
}

/// Append-only ledger plus the set of ids it already holds.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    captured: HashSet<BlockId>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless already captured. Returns the new entry.
    pub fn append(&mut self, transaction_block: BlockId, confirmed_by: &str) -> Option<&LedgerEntry> {
        if !self.captured.insert(transaction_block.clone()) {
            return None;
        }
        let position = self.entries.len() as u64;
        self.entries.push(LedgerEntry { position, transaction_block, confirmed_by: confirmed_by.to_string() });
        self.entries.last()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.captured.contains(id)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
