//! The single writer: pulls batches from an event source, applies them to the
//! shared visualizer, and releases deferred events on every tick.

use crate::events::EventSource;
use crate::visualizer::{EventQueue, SharedVisualizer};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

pub struct EventLoop<S> {
    source: S,
    vis: SharedVisualizer,
    queue: EventQueue,
    tick: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: EventSource> EventLoop<S> {
    pub fn new(source: S, vis: SharedVisualizer, tick: Duration, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self { source, vis, queue: EventQueue::new(), tick, shutdown_rx }
    }

    fn drain(vis: &SharedVisualizer, queue: &mut EventQueue) {
        if queue.ready_len() == 0 {
            return;
        }
        let mut guard = vis.write();
        queue.drain_into(&mut guard);
        guard.publish_gauges();
    }

    /// Run until shutdown is signalled. An exhausted source keeps the loop
    /// alive so deferred events still drain and queries still answer.
    pub async fn run(self) -> Result<()> {
        let EventLoop { mut source, vis, mut queue, tick, mut shutdown_rx } = self;
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut source_open = true;
        info!(source = source.name(), "event loop started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    queue.tick();
                    Self::drain(&vis, &mut queue);
                }
                batch = source.next_batch(), if source_open => match batch {
                    Some(events) => {
                        queue.extend(events);
                        Self::drain(&vis, &mut queue);
                    }
                    None => {
                        info!(source = source.name(), "event source exhausted");
                        source_open = false;
                    }
                },
            }
        }
        info!(source = source.name(), pending = queue.deferred_len(), "event loop stopped");
        Ok(())
    }
}
