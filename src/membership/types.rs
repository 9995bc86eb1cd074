use crate::error::{OverlayError, OverlayResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Liveness of a known peer as seen by the health monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Healthy,
    Suspect,
    Dead,
}

impl PeerStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "healthy" => Some(Self::Healthy),
            "suspect" => Some(Self::Suspect),
            "dead" => Some(Self::Dead),
            _ => None,
        }
    }
}

/// A peer this node knows about, keyed by its URL in the registry.
///
/// Records are values: the registry replaces a record as a whole and hands out
/// clones, so a reader never sees a half-applied transition.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerRecord {
    pub url: String,
    pub first_seen: Instant,
    /// Last registration or successful probe.
    pub last_seen: Instant,
    pub status: PeerStatus,
    pub consecutive_failures: u32,
}

impl PeerRecord {
    pub fn new(url: String, now: Instant) -> Self {
        Self {
            url,
            first_seen: now,
            last_seen: now,
            status: PeerStatus::Suspect,
            consecutive_failures: 0,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.status == PeerStatus::Dead
    }

    pub(crate) fn refreshed(&self, now: Instant) -> Self {
        Self {
            last_seen: now,
            ..self.clone()
        }
    }

    pub(crate) fn after_success(&self, now: Instant) -> Self {
        Self {
            url: self.url.clone(),
            first_seen: self.first_seen,
            last_seen: now,
            status: PeerStatus::Healthy,
            consecutive_failures: 0,
        }
    }

    pub(crate) fn after_failure(&self, failure_threshold: u32) -> Self {
        let consecutive_failures = self.consecutive_failures.saturating_add(1);
        let status = if consecutive_failures >= failure_threshold {
            PeerStatus::Dead
        } else {
            PeerStatus::Suspect
        };

        Self {
            url: self.url.clone(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            status,
            consecutive_failures,
        }
    }
}

/// Counts of known peers by status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_peers: usize,
    pub healthy_peers: usize,
    pub suspect_peers: usize,
    pub dead_peers: usize,
}

/// Outcome of a bootstrap round against the configured friends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Friends that accepted our registration.
    pub registered: Vec<String>,
    /// Friends whose handshake failed; they are still tracked locally.
    pub failed: Vec<String>,
}

/// Parses a peer URL and returns it in canonical form (no trailing slash).
///
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn normalize_peer_url(raw: &str) -> OverlayResult<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| OverlayError::InvalidPeer(format!("{:?} is not a url: {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(OverlayError::InvalidPeer(format!(
            "{} must use http or https",
            trimmed
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(OverlayError::InvalidPeer(format!("{} has no host", trimmed)));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(OverlayError::InvalidPeer(format!(
            "{} must not carry a query or fragment",
            trimmed
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// A record transition produced by applying one probe outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub previous: PeerStatus,
    pub record: PeerRecord,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.previous != self.record.status
    }
}
