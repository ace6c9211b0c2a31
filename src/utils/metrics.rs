use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const BLOCKS_ADDED: &str = "blocks_added";
pub const BLOCKS_DUPLICATE: &str = "blocks_duplicate";
pub const BLOCKS_UNKNOWN_PARENT: &str = "blocks_unknown_parent";
pub const BLOCKS_ILLEGAL_FORK: &str = "blocks_illegal_fork";
pub const VOTES_CAST: &str = "votes_cast";
pub const VOTES_AFTER_FINALIZATION: &str = "votes_after_finalization";
pub const BLOCKS_FINALIZED: &str = "blocks_finalized";
pub const LEDGER_ENTRIES: &str = "ledger_entries";
pub const BLOCKS_EVICTED: &str = "blocks_evicted";
pub const POOL_REJECTED: &str = "pool_rejected";
pub const FEED_FRAMES_DROPPED: &str = "feed_frames_dropped";
pub const EVENTS_APPLIED: &str = "events_applied";
pub const EVENTS_DROPPED: &str = "events_dropped";

/// Metrics registry (simple, Prometheus-style)
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<Mutex<BTreeMap<String, u64>>>,
    gauges: Arc<Mutex<BTreeMap<String, f64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1);
    }

    pub fn add_counter(&self, name: &str, by: u64) {
        let mut counters = self.counters.lock();
        *counters.entry(name.to_string()).or_insert(0) += by;
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn set_gauge(&self, name: &str, val: f64) {
        self.gauges.lock().insert(name.to_string(), val);
    }

    pub fn snapshot(&self) -> (BTreeMap<String, u64>, BTreeMap<String, f64>) {
        (self.counters.lock().clone(), self.gauges.lock().clone())
    }
}

lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}
