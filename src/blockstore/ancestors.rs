use crate::blockstore::chain::Chain;
use crate::blockstore::types::Block;

/// Walks parent links from a block back towards genesis, inclusive.
///
/// Lazy and finite (depth strictly decreases). Clone it to restart from the
/// same point. The walk ends early at the oldest ancestor that is still active
/// when older ones have been evicted.
#[derive(Clone)]
pub struct Ancestors<'a> {
    chain: &'a Chain,
    next: Option<&'a Block>,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(chain: &'a Chain, start: Option<&'a Block>) -> Self {
        Self { chain, next: start }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = cur.parent.as_deref().and_then(|p| self.chain.get(p));
        Some(cur)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(b) => (1, Some(b.depth as usize + 1)),
            None => (0, Some(0)),
        }
    }
}
