//! Flooding Search Coordinator
//!
//! Answers a query from the local index and relays it to a bounded set of
//! neighbours, which do the same with one hop less:
//!
//! 1. A query id seen before (and not yet expired) gets an empty answer.
//! 2. Local matches are always part of the answer.
//! 3. With `ttl == 0` the local matches are the whole answer.
//! 4. Otherwise up to `fanout` live, unvisited neighbours receive the query
//!    concurrently, each under its own timeout, and the whole fan-out under an
//!    overall deadline. Replies that arrive in time are merged; the rest are
//!    dropped without failing the search.
//!
//! Every hop lowers `ttl`, so a query dies after at most `ttl` hops and each
//! peer sends at most `fanout` relays per query id.
//!
//! Waiting time shrinks along the path as well. A relay is waited on for
//! `forward_timeout * (ttl + 1)` of the relayed request, capped by this hop's
//! own budget, and carries that wait minus [`HOP_MARGIN`] as the receiver's
//! budget. A peer therefore always answers its parent before the parent
//! gives up on it, even when a peer further down stays silent.

use crate::config::PeerConfig;
use crate::error::OverlayError;
use crate::index::LocalIndex;
use crate::membership::registry::PeerRegistry;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

use super::dedup::QueryDedupCache;
use super::forwarder::QueryForwarder;
use super::types::{SearchRequest, SearchResult};

/// Hop budgets above this are clamped.
pub const MAX_TTL: u32 = 16;

/// Slack between a parent's wait on a relay and the budget the relay gets.
pub const HOP_MARGIN: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Hard cap on the fanout a caller may ask for.
    pub max_fanout: usize,
    pub forward_timeout: Duration,
    /// Overall deadline for collecting relay replies.
    pub deadline: Duration,
}

impl SearchSettings {
    pub fn from_config(config: &PeerConfig) -> Self {
        Self {
            max_fanout: config.max_fanout,
            forward_timeout: config.forward_timeout(),
            deadline: config.search_deadline(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_fanout: 3,
            forward_timeout: Duration::from_secs(2),
            deadline: Duration::from_secs(5),
        }
    }
}

pub struct SearchCoordinator {
    registry: Arc<PeerRegistry>,
    index: Arc<dyn LocalIndex>,
    forwarder: Arc<dyn QueryForwarder>,
    dedup: QueryDedupCache,
    settings: SearchSettings,
}

impl SearchCoordinator {
    pub fn new(
        registry: Arc<PeerRegistry>,
        index: Arc<dyn LocalIndex>,
        forwarder: Arc<dyn QueryForwarder>,
        settings: SearchSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            index,
            forwarder,
            dedup: QueryDedupCache::new(settings.deadline),
            settings,
        })
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// The fanout actually used for a requested fanout.
    pub fn effective_fanout(&self, requested: usize) -> usize {
        requested.min(self.settings.max_fanout)
    }

    pub fn dedup(&self) -> &QueryDedupCache {
        &self.dedup
    }

    /// How long this hop may spend on `request`: the configured deadline,
    /// shortened by whatever budget the sender granted.
    fn budget_for(&self, request: &SearchRequest) -> Duration {
        request
            .budget()
            .map_or(self.settings.deadline, |granted| granted.min(self.settings.deadline))
    }

    /// How long to wait on one relay of `relayed`, given this hop's budget.
    fn relay_wait(&self, relayed: &SearchRequest, budget: Duration) -> Duration {
        self.settings
            .forward_timeout
            .saturating_mul(relayed.ttl.saturating_add(1))
            .min(budget)
    }

    /// Resolves `request` locally and across the overlay. Never fails:
    /// unreachable peers only make the answer less complete.
    pub async fn search(&self, mut request: SearchRequest) -> Vec<SearchResult> {
        request.ttl = request.ttl.min(MAX_TTL);

        if !self.dedup.first_observation(&request.query_id, request.ttl) {
            tracing::debug!("Query {} already handled here, skipping", request.query_id);
            return Vec::new();
        }

        let self_url = self.registry.self_url().to_string();
        let mut merged = MergedResults::default();
        merged.extend(
            self.index
                .find(&request.term)
                .into_iter()
                .map(|entry| SearchResult::from_entry(&self_url, entry)),
        );

        let budget = self.budget_for(&request);
        if request.ttl == 0 || budget.is_zero() {
            return merged.into_vec();
        }

        let fanout = self.effective_fanout(request.fanout);
        let targets = self.registry.fanout_candidates(&request.visited, fanout);
        if targets.is_empty() {
            tracing::debug!("Query {} has no forwarding targets", request.query_id);
            return merged.into_vec();
        }

        let deadline = Instant::now() + budget;
        let relayed = request.forwarded(&self_url);
        let timeout = self.relay_wait(&relayed, budget);
        let relayed = relayed.with_budget(timeout.saturating_sub(HOP_MARGIN));
        let mut forwards = JoinSet::new();

        tracing::debug!(
            "Forwarding query {} (ttl {}, wait {:?}) to {} peer(s)",
            request.query_id,
            relayed.ttl,
            timeout,
            targets.len()
        );

        for target in targets {
            let forwarder = self.forwarder.clone();
            let request = relayed.clone();
            forwards.spawn(async move {
                let outcome =
                    match tokio::time::timeout(timeout, forwarder.forward(&target.url, request))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(OverlayError::unreachable(
                            &target.url,
                            format!("no reply within {:?}", timeout),
                        )),
                    };
                (target.url, outcome)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, forwards.join_next()).await {
                Ok(Some(Ok((url, Ok(results))))) => {
                    tracing::debug!("{} returned {} result(s)", url, results.len());
                    merged.extend(results);
                }
                Ok(Some(Ok((_, Err(e))))) => {
                    tracing::debug!("Dropping relay reply: {}", e);
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("Relay task failed: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Search deadline hit for query {}, abandoning {} relay(s)",
                        request.query_id,
                        forwards.len()
                    );
                    forwards.abort_all();
                    break;
                }
            }
        }

        merged.into_vec()
    }
}

/// Results keyed by `(peer_url, file_name)`. Merging is commutative and
/// idempotent, so arrival order never changes the outcome.
#[derive(Default)]
struct MergedResults {
    by_key: BTreeMap<(String, String), SearchResult>,
}

impl MergedResults {
    fn extend(&mut self, results: impl IntoIterator<Item = SearchResult>) {
        for result in results {
            self.by_key
                .entry((result.peer_url.clone(), result.file_name.clone()))
                .or_insert(result);
        }
    }

    fn into_vec(self) -> Vec<SearchResult> {
        self.by_key.into_values().collect()
    }
}
