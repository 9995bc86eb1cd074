use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Idle buckets are swept once every this many admission checks.
const EVICTION_INTERVAL: u64 = 256;

/// Fixed-window request counter for one client.
#[derive(Debug, Clone)]
pub struct RateLimitBucket {
    pub client_key: String,
    pub window_start: Instant,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow { remaining: u32 },
    Deny { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow { .. })
    }
}

/// Per-client fixed-window admission control.
///
/// Each check increments the client's counter under the bucket's shard lock,
/// so concurrent requests from one client are counted exactly once each.
pub struct RateLimiter {
    threshold: u32,
    window: Duration,
    buckets: DashMap<String, RateLimitBucket>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            threshold,
            window,
            buckets: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_window, config.window())
    }

    pub fn check(&self, client_key: &str) -> Admission {
        let now = Instant::now();

        let admission = {
            let mut bucket = self
                .buckets
                .entry(client_key.to_string())
                .or_insert_with(|| RateLimitBucket {
                    client_key: client_key.to_string(),
                    window_start: now,
                    count: 0,
                });

            if now.saturating_duration_since(bucket.window_start) > self.window {
                bucket.window_start = now;
                bucket.count = 0;
            }
            bucket.count = bucket.count.saturating_add(1);

            if bucket.count > self.threshold {
                let elapsed = now.saturating_duration_since(bucket.window_start);
                Admission::Deny {
                    retry_after: self.window.saturating_sub(elapsed),
                }
            } else {
                Admission::Allow {
                    remaining: self.threshold - bucket.count,
                }
            }
        };

        if self.checks.fetch_add(1, Ordering::Relaxed) % EVICTION_INTERVAL == EVICTION_INTERVAL - 1 {
            self.evict_idle();
        }

        admission
    }

    /// Drops buckets whose window has already run out. Such a bucket would be
    /// reset on its client's next request anyway, so nothing is lost.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.window_start) <= self.window);
        let evicted = before.saturating_sub(self.buckets.len());
        if evicted > 0 {
            tracing::debug!("Evicted {} idle rate-limit buckets", evicted);
        }
        evicted
    }

    pub fn bucket(&self, client_key: &str) -> Option<RateLimitBucket> {
        self.buckets.get(client_key).map(|bucket| bucket.value().clone())
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
