//! Startup Configuration
//!
//! The node reads a single JSON document once at startup. Every tunable has a
//! default so a minimal file only needs `name`, `self_url` and `bind_addr`.
//! After loading, [`PeerConfig::validate`] rejects malformed values so the
//! process fails fast instead of running with a degraded setup.

use crate::error::{OverlayError, OverlayResult};
use crate::membership::types::normalize_peer_url;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV: &str = "PEER_CONFIG";

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_shared_dir() -> PathBuf {
    PathBuf::from("shared")
}

fn default_search_ttl() -> u32 {
    3
}

fn default_search_fanout() -> usize {
    2
}

fn default_max_fanout() -> usize {
    3
}

fn default_forward_timeout_ms() -> u64 {
    2_000
}

fn default_search_deadline_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_requests_per_window() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_dead_grace_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_window", alias = "requests_per_minute")]
    pub requests_per_window: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds between two probe cycles.
    #[serde(default = "default_interval_secs", alias = "health_check_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Consecutive failed probes after which a peer is declared dead.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long a dead peer is retained before it is pruned.
    #[serde(default = "default_dead_grace_secs")]
    pub dead_grace_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            failure_threshold: default_failure_threshold(),
            dead_grace_secs: default_dead_grace_secs(),
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn dead_grace(&self) -> Duration {
        Duration::from_secs(self.dead_grace_secs)
    }
}

/// Immutable, validated configuration of a single peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,

    /// URL other peers use to reach this node. Never registered locally.
    pub self_url: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Seed peers contacted by bootstrap.
    #[serde(default)]
    pub friends: Vec<String>,

    #[serde(default, skip_serializing)]
    pub friend_primary: Option<String>,

    #[serde(default, skip_serializing)]
    pub friend_secondary: Option<String>,

    #[serde(default = "default_shared_dir")]
    pub shared_dir: PathBuf,

    #[serde(default = "default_search_ttl")]
    pub search_ttl: u32,

    #[serde(default = "default_search_fanout")]
    pub search_fanout: usize,

    #[serde(default = "default_max_fanout")]
    pub max_fanout: usize,

    #[serde(default = "default_forward_timeout_ms")]
    pub forward_timeout_ms: u64,

    #[serde(default = "default_search_deadline_ms")]
    pub search_deadline_ms: u64,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl PeerConfig {
    /// Builds a configuration with every tunable at its default.
    pub fn new(name: &str, self_url: &str) -> Self {
        Self {
            name: name.to_string(),
            self_url: self_url.to_string(),
            bind_addr: default_bind_addr(),
            friends: Vec::new(),
            friend_primary: None,
            friend_secondary: None,
            shared_dir: default_shared_dir(),
            search_ttl: default_search_ttl(),
            search_fanout: default_search_fanout(),
            max_fanout: default_max_fanout(),
            forward_timeout_ms: default_forward_timeout_ms(),
            search_deadline_ms: default_search_deadline_ms(),
            rate_limit: RateLimitConfig::default(),
            health: HealthConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Reads and validates the configuration file at `path`.
    pub fn load(path: &Path) -> OverlayResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OverlayError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> OverlayResult<Self> {
        let config: PeerConfig = serde_json::from_str(raw)
            .map_err(|e| OverlayError::Config(format!("malformed config: {}", e)))?;
        config.validate()
    }

    /// Normalizes URLs, folds the legacy friend keys into `friends` and
    /// rejects values the node cannot run with.
    pub fn validate(mut self) -> OverlayResult<Self> {
        if self.name.trim().is_empty() {
            return Err(OverlayError::Config("name must not be empty".into()));
        }

        self.self_url = normalize_peer_url(&self.self_url)
            .map_err(|e| OverlayError::Config(format!("self_url: {}", e)))?;

        let legacy = [self.friend_primary.take(), self.friend_secondary.take()];
        let mut friends = Vec::new();
        for raw in self
            .friends
            .drain(..)
            .chain(legacy.into_iter().flatten())
            .filter(|f| !f.trim().is_empty())
        {
            let friend = normalize_peer_url(&raw)
                .map_err(|e| OverlayError::Config(format!("friend {}: {}", raw, e)))?;
            if friend == self.self_url {
                return Err(OverlayError::Config(format!(
                    "friend {} is this peer's own url",
                    friend
                )));
            }
            if !friends.contains(&friend) {
                friends.push(friend);
            }
        }
        self.friends = friends;

        if self.max_fanout == 0 {
            return Err(OverlayError::Config("max_fanout must be at least 1".into()));
        }
        if self.forward_timeout_ms == 0 {
            return Err(OverlayError::Config("forward_timeout_ms must be positive".into()));
        }
        if self.search_deadline_ms < self.forward_timeout_ms {
            return Err(OverlayError::Config(
                "search_deadline_ms must not be shorter than forward_timeout_ms".into(),
            ));
        }
        if self.rate_limit.requests_per_window == 0 || self.rate_limit.window_secs == 0 {
            return Err(OverlayError::Config(
                "rate_limit needs a positive threshold and window".into(),
            ));
        }
        if self.health.interval_secs == 0 || self.health.probe_timeout_ms == 0 {
            return Err(OverlayError::Config(
                "health interval and probe timeout must be positive".into(),
            ));
        }
        if self.health.failure_threshold == 0 {
            return Err(OverlayError::Config(
                "health.failure_threshold must be at least 1".into(),
            ));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(OverlayError::Config(format!(
                "unknown log_level {}",
                self.log_level
            )));
        }

        Ok(self)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    pub fn search_deadline(&self) -> Duration {
        Duration::from_millis(self.search_deadline_ms)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests;
