//! Query Duplicate Suppression
//!
//! Remembers which query identifiers this peer has already processed. The
//! friend graph may contain cycles, so a query can reach the same peer along
//! several paths; only the first arrival is answered and relayed.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Expired entries are purged once every this many new observations.
const PURGE_INTERVAL: u64 = 256;

/// Upper bound on how long a single entry is remembered.
const MAX_ENTRY_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDedupEntry {
    pub expires_at: Instant,
}

pub struct QueryDedupCache {
    entries: DashMap<String, QueryDedupEntry>,
    window_per_hop: Duration,
    observations: AtomicU64,
}

impl QueryDedupCache {
    /// Entries live for `window_per_hop * (ttl + 1)`, i.e. for as long as the
    /// query can still be in flight anywhere downstream.
    pub fn new(window_per_hop: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            window_per_hop,
            observations: AtomicU64::new(0),
        }
    }

    /// Records `query_id` and reports whether this is its first unexpired
    /// observation. Check and insert happen under one shard lock, so two
    /// concurrent deliveries of the same id cannot both return `true`.
    pub fn first_observation(&self, query_id: &str, ttl: u32) -> bool {
        let now = Instant::now();
        let lifetime = self
            .window_per_hop
            .checked_mul(ttl.saturating_add(1))
            .unwrap_or(MAX_ENTRY_LIFETIME)
            .min(MAX_ENTRY_LIFETIME);
        let fresh = QueryDedupEntry {
            expires_at: now + lifetime,
        };

        let first = match self.entries.entry(query_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at > now {
                    false
                } else {
                    entry.insert(fresh);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(fresh);
                true
            }
        };

        if first
            && self.observations.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL
                == PURGE_INTERVAL - 1
        {
            self.purge_expired();
        }

        first
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
