//! Peer Registry
//!
//! Concurrency-safe table of known peers keyed by URL. Every mutation replaces
//! a whole [`PeerRecord`] while holding the key's shard lock, and every read
//! returns clones, so callers only ever see complete records.

use crate::error::{OverlayError, OverlayResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::protocol::PeerAnnouncer;
use super::types::{
    BootstrapReport, PeerRecord, PeerStatus, RegistryStats, StatusChange, normalize_peer_url,
};

pub struct PeerRegistry {
    self_url: String,
    peers: DashMap<String, PeerRecord>,
}

impl PeerRegistry {
    pub fn new(self_url: &str) -> OverlayResult<Arc<Self>> {
        Ok(Arc::new(Self {
            self_url: normalize_peer_url(self_url)?,
            peers: DashMap::new(),
        }))
    }

    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Inserts a peer or refreshes `last_seen` of an existing one.
    ///
    /// Re-registration never touches `first_seen`, `status` or the failure
    /// counter; those belong to the health monitor.
    pub fn register(&self, raw_url: &str) -> OverlayResult<PeerRecord> {
        let url = normalize_peer_url(raw_url)?;
        if url == self.self_url {
            return Err(OverlayError::InvalidPeer(format!(
                "{} is this peer's own url",
                url
            )));
        }

        let now = Instant::now();
        let record = match self.peers.entry(url) {
            Entry::Occupied(mut entry) => {
                let refreshed = entry.get().refreshed(now);
                entry.insert(refreshed.clone());
                debug!("Refreshed peer {}", refreshed.url);
                refreshed
            }
            Entry::Vacant(entry) => {
                let record = PeerRecord::new(entry.key().clone(), now);
                info!("Registered new peer {}", record.url);
                entry.insert(record.clone());
                record
            }
        };

        Ok(record)
    }

    /// Announces this peer to every friend and tracks each friend locally.
    ///
    /// Friends whose handshake fails are still registered so the health
    /// monitor can pick them up once they come online. Safe to repeat.
    pub async fn bootstrap(
        &self,
        friends: &[String],
        announcer: &dyn PeerAnnouncer,
    ) -> BootstrapReport {
        let mut report = BootstrapReport::default();

        for friend in friends {
            let record = match self.register(friend) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping friend {}: {}", friend, e);
                    report.failed.push(friend.clone());
                    continue;
                }
            };

            match announcer.announce(&record.url, &self.self_url).await {
                Ok(()) => {
                    info!("Bootstrapped with friend {}", record.url);
                    report.registered.push(record.url);
                }
                Err(e) => {
                    warn!("Bootstrap handshake with {} failed: {}", record.url, e);
                    report.failed.push(record.url);
                }
            }
        }

        report
    }

    pub fn get(&self, url: &str) -> Option<PeerRecord> {
        self.peers.get(url).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of the known peers, sorted by URL.
    pub fn list(&self, filter: Option<PeerStatus>) -> Vec<PeerRecord> {
        let mut records: Vec<PeerRecord> = self
            .peers
            .iter()
            .filter(|entry| filter.is_none_or(|status| entry.value().status == status))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.url.cmp(&b.url));
        records
    }

    pub fn healthy_urls(&self) -> Vec<String> {
        self.list(Some(PeerStatus::Healthy))
            .into_iter()
            .map(|record| record.url)
            .collect()
    }

    /// Applies a successful probe: Healthy, failure counter reset.
    pub fn record_success(&self, url: &str) -> Option<StatusChange> {
        let now = Instant::now();
        let mut entry = self.peers.get_mut(url)?;
        let previous = entry.status;
        let next = entry.after_success(now);
        *entry = next.clone();

        Some(StatusChange {
            previous,
            record: next,
        })
    }

    /// Applies a failed probe. The peer becomes Suspect, or Dead once
    /// `failure_threshold` consecutive failures have accumulated.
    pub fn record_failure(&self, url: &str, failure_threshold: u32) -> Option<StatusChange> {
        let mut entry = self.peers.get_mut(url)?;
        let previous = entry.status;
        let next = entry.after_failure(failure_threshold);
        *entry = next.clone();

        Some(StatusChange {
            previous,
            record: next,
        })
    }

    /// Removes peers that have been dead for longer than `max_dead_age`.
    pub fn prune(&self, max_dead_age: Duration) -> Vec<String> {
        let now = Instant::now();
        let expired = |record: &PeerRecord| {
            record.is_dead() && now.saturating_duration_since(record.last_seen) > max_dead_age
        };

        let candidates: Vec<String> = self
            .peers
            .iter()
            .filter(|entry| expired(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = Vec::new();
        for url in candidates {
            // A probe may have revived the peer since the scan.
            if self.peers.remove_if(&url, |_, record| expired(record)).is_some() {
                info!("Pruned dead peer {}", url);
                removed.push(url);
            }
        }

        removed
    }

    /// Picks up to `limit` forwarding targets for a search.
    ///
    /// Dead peers, visited peers and this node are excluded. The rest are
    /// ordered Healthy before Suspect, then most recently seen first, then by
    /// URL so equal candidates always come out in the same order.
    pub fn fanout_candidates(&self, visited: &BTreeSet<String>, limit: usize) -> Vec<PeerRecord> {
        let mut candidates: Vec<PeerRecord> = self
            .peers
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|record| {
                !record.is_dead() && record.url != self.self_url && !visited.contains(&record.url)
            })
            .collect();

        candidates.sort_by(|a, b| {
            let rank = |record: &PeerRecord| match record.status {
                PeerStatus::Healthy => 0,
                PeerStatus::Suspect => 1,
                PeerStatus::Dead => 2,
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| Reverse(a.last_seen).cmp(&Reverse(b.last_seen)))
                .then_with(|| a.url.cmp(&b.url))
        });
        candidates.truncate(limit);
        candidates
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.peers.iter() {
            stats.total_peers += 1;
            match entry.value().status {
                PeerStatus::Healthy => stats.healthy_peers += 1,
                PeerStatus::Suspect => stats.suspect_peers += 1,
                PeerStatus::Dead => stats.dead_peers += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
