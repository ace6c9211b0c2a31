use crate::events::VisEvent;
use crate::visualizer::{StepOutcome, Visualizer};
use std::collections::VecDeque;

/// Logical event queue. Events run in arrival order; deferred ones wait for
/// the next `tick`.
#[derive(Debug, Default)]
pub struct EventQueue {
    ready: VecDeque<VisEvent>,
    next_tick: Vec<VisEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: VisEvent) {
        self.ready.push_back(event);
    }

    pub fn extend<I: IntoIterator<Item = VisEvent>>(&mut self, events: I) {
        self.ready.extend(events);
    }

    pub fn defer(&mut self, event: VisEvent) {
        self.next_tick.push(event);
    }

    /// Release deferred events behind whatever is already ready.
    pub fn tick(&mut self) {
        self.ready.extend(self.next_tick.drain(..));
    }

    pub fn pop(&mut self) -> Option<VisEvent> {
        self.ready.pop_front()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn deferred_len(&self) -> usize {
        self.next_tick.len()
    }

    pub fn is_idle(&self) -> bool {
        self.ready.is_empty() && self.next_tick.is_empty()
    }

    /// Run every ready event through `vis`, parking deferred follow-ups.
    pub fn drain_into(&mut self, vis: &mut Visualizer) -> Vec<StepOutcome> {
        let mut outcomes = Vec::with_capacity(self.ready.len());
        while let Some(event) = self.pop() {
            let mut outcome = vis.handle(event);
            for deferred in outcome.deferred.drain(..) {
                self.defer(deferred);
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_releases_after_ready() {
        let mut q = EventQueue::new();
        q.push(VisEvent::CastVotesForFrontier { chain: 0 });
        q.defer(VisEvent::CastVotesForFrontier { chain: 1 });
        assert_eq!(q.deferred_len(), 1);
        q.tick();
        assert_eq!(q.pop(), Some(VisEvent::CastVotesForFrontier { chain: 0 }));
        assert_eq!(q.pop(), Some(VisEvent::CastVotesForFrontier { chain: 1 }));
        assert!(q.is_idle());
    }
}
