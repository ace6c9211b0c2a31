use crate::consensus::types::{FinalityConfig, Weight};
use crate::events::SyntheticConfig;
use crate::utils::errors::VisError;
use crate::visualizer::VisualizerParams;
use crate::window::WindowPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration, loaded from TOML. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VisConfig {
    pub chains: ChainsConfig,
    pub finality: FinalitySettings,
    pub window: WindowConfig,
    pub pool: PoolConfig,
    pub synthetic: SyntheticConfig,
    pub feed: FeedConfig,
    pub node: NodeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainsConfig {
    pub voter_chains: u16,
    /// evicted ids remembered per chain
    pub tombstone_limit: usize,
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self { voter_chains: 100, tombstone_limit: 4096 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalitySettings {
    pub base_weight: f64,
    pub vote_increment: f64,
    pub threshold: f64,
}

impl Default for FinalitySettings {
    fn default() -> Self {
        Self { base_weight: 0.3, vote_increment: 0.01, threshold: 0.35 }
    }
}

impl FinalitySettings {
    pub fn to_finality(&self) -> FinalityConfig {
        FinalityConfig {
            base_weight: Weight::from_fraction(self.base_weight),
            vote_increment: Weight::from_fraction(self.vote_increment),
            threshold: Weight::from_fraction(self.threshold),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub proposer: WindowPolicy,
    pub voter: WindowPolicy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            proposer: WindowPolicy { capacity: 16, span: 12 },
            voter: WindowPolicy { capacity: 8, span: 6 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub max_frame_len: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { max_frame_len: 1 << 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// deferred events are released once per tick
    pub tick_ms: u64,
    pub rpc_addr: Option<String>,
    pub log_level: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self { tick_ms: 1000, rpc_addr: None, log_level: "info".into() }
    }
}

impl VisConfig {
    /// Load config from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: VisConfig = toml::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> std::result::Result<(), VisError> {
        let bad = |msg: &str| -> std::result::Result<(), VisError> { Err(VisError::Config(msg.to_string())) };
        if self.window.proposer.capacity == 0 || self.window.voter.capacity == 0 {
            return bad("window capacity must be at least 1");
        }
        let widest = self.window.proposer.capacity.max(self.window.voter.capacity);
        if self.chains.tombstone_limit == 0 || self.chains.tombstone_limit < widest {
            return bad("tombstone_limit must be at least the widest window capacity");
        }
        if self.pool.capacity == 0 {
            return bad("pool capacity must be at least 1");
        }
        if self.node.tick_ms == 0 {
            return bad("tick_ms must be positive");
        }
        let f = &self.finality;
        if f.vote_increment.is_nan() || f.vote_increment <= 0.0 || f.base_weight < 0.0 {
            return bad("vote_increment must be positive and base_weight non-negative");
        }
        if f.threshold <= f.base_weight {
            return bad("threshold must be above base_weight");
        }
        let s = &self.synthetic;
        let rates = [s.transaction_rate, s.proposer_rate, s.voter_rate];
        if s.participants == 0 || rates.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return bad("synthetic participants and rates must be positive");
        }
        if self.feed.max_frame_len == 0 {
            return bad("feed max_frame_len must be positive");
        }
        Ok(())
    }

    pub fn visualizer_params(&self) -> VisualizerParams {
        VisualizerParams {
            voter_chains: self.chains.voter_chains,
            finality: self.finality.to_finality(),
            proposer_window: self.window.proposer,
            voter_window: self.window.voter,
            pool_capacity: self.pool.capacity,
            tombstone_limit: self.chains.tombstone_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate_and_round_trip() {
        let cfg = VisConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.chains.voter_chains, 100);
        assert_eq!(cfg.finality.to_finality(), FinalityConfig::default());
        let text = cfg.to_toml().unwrap();
        let back: VisConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: VisConfig = toml::from_str("[window.proposer]\ncapacity = 5\nspan = 3\n[synthetic]\nseed = 9\n").unwrap();
        assert_eq!(cfg.window.proposer, WindowPolicy { capacity: 5, span: 3 });
        assert_eq!(cfg.window.voter, WindowConfig::default().voter);
        assert_eq!(cfg.synthetic.seed, Some(9));
        assert_eq!(cfg.pool.capacity, 500);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = VisConfig::default();
        cfg.finality.threshold = 0.2;
        assert!(matches!(cfg.validate(), Err(VisError::Config(_))));

        let mut cfg = VisConfig::default();
        cfg.window.voter.capacity = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = VisConfig::default();
        cfg.synthetic.voter_rate = 0.0;
        assert!(cfg.validate().is_err());
        let mut cfg = VisConfig::default();
        cfg.chains.tombstone_limit = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = VisConfig::default();
        cfg.chains.tombstone_limit = cfg.window.proposer.capacity - 1;
        assert!(cfg.validate().is_err());
        cfg.chains.tombstone_limit = cfg.window.proposer.capacity.max(cfg.window.voter.capacity);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("prismvis-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[chains]\nvoter_chains = 7\n").unwrap();
        let cfg = VisConfig::load(&path).unwrap();
        assert_eq!(cfg.chains.voter_chains, 7);
        std::fs::remove_file(&path).unwrap();
    }
}
