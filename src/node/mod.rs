//! Peer Node Assembly
//!
//! Builds the subsystems from a validated configuration, injects the shared
//! registry into each of them and exposes the HTTP surface.
//!
//! ## Request Path
//! Every request passes the rate limiter first (except `/health`). Register
//! and bootstrap requests mutate the registry; search requests drive the
//! coordinator, which reads the registry for relay targets. The health
//! monitor runs on its own timer next to all of this.

pub mod client;
pub mod handlers;


use crate::config::PeerConfig;
use crate::error::OverlayResult;
use crate::health::handlers::handle_health;
use crate::health::monitor::{HealthMonitor, HealthSettings};
use crate::health::probe::{ENDPOINT_HEALTH, LivenessProbe};
use crate::index::LocalIndex;
use crate::index::directory::DirectoryIndex;
use crate::membership::handlers::{
    bootstrap_and_probe, handle_bootstrap, handle_peers, handle_register,
};
use crate::membership::protocol::{
    ENDPOINT_BOOTSTRAP, ENDPOINT_PEERS, ENDPOINT_REGISTER, PeerAnnouncer,
};
use crate::membership::registry::PeerRegistry;
use crate::membership::types::BootstrapReport;
use crate::ratelimit::limiter::RateLimiter;
use crate::ratelimit::middleware::rate_limit;
use crate::search::coordinator::{SearchCoordinator, SearchSettings};
use crate::search::forwarder::{
    ENDPOINT_FILES, ENDPOINT_INTERNAL_SEARCH, ENDPOINT_SEARCH, QueryForwarder,
};
use crate::search::handlers::{handle_files, handle_internal_search, handle_search};

use axum::routing::{get, post};
use axum::{Extension, Router, middleware};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use client::HttpPeerClient;
use handlers::{ENDPOINT_STATUS, StartedAt, handle_status};

/// The external collaborators a node talks to.
pub struct Collaborators {
    pub index: Arc<dyn LocalIndex>,
    pub probe: Arc<dyn LivenessProbe>,
    pub forwarder: Arc<dyn QueryForwarder>,
    pub announcer: Arc<dyn PeerAnnouncer>,
}

impl Collaborators {
    /// Directory-backed index and HTTP transport, as used in production.
    pub fn from_config(config: &PeerConfig) -> OverlayResult<Self> {
        let client = Arc::new(HttpPeerClient::new(config)?);
        Ok(Self {
            index: Arc::new(DirectoryIndex::open(config.shared_dir.clone())),
            probe: client.clone(),
            forwarder: client.clone(),
            announcer: client,
        })
    }
}

#[derive(Clone)]
pub struct PeerNode {
    pub config: Arc<PeerConfig>,
    pub registry: Arc<PeerRegistry>,
    pub monitor: Arc<HealthMonitor>,
    pub coordinator: Arc<SearchCoordinator>,
    pub limiter: Arc<RateLimiter>,
    pub index: Arc<dyn LocalIndex>,
    pub announcer: Arc<dyn PeerAnnouncer>,
    started_at: Instant,
}

impl PeerNode {
    pub fn new(config: PeerConfig, collaborators: Collaborators) -> OverlayResult<Self> {
        let config = Arc::new(config);
        let registry = PeerRegistry::new(&config.self_url)?;

        let monitor = HealthMonitor::new(
            registry.clone(),
            collaborators.probe,
            HealthSettings::from(&config.health),
        );
        let coordinator = SearchCoordinator::new(
            registry.clone(),
            collaborators.index.clone(),
            collaborators.forwarder,
            SearchSettings::from_config(&config),
        );
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

        Ok(Self {
            config,
            registry,
            monitor,
            coordinator,
            limiter,
            index: collaborators.index,
            announcer: collaborators.announcer,
            started_at: Instant::now(),
        })
    }

    pub fn from_config(config: PeerConfig) -> OverlayResult<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        Self::new(config, collaborators)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(ENDPOINT_HEALTH, get(handle_health))
            .route(ENDPOINT_REGISTER, post(handle_register))
            .route(ENDPOINT_BOOTSTRAP, post(handle_bootstrap))
            .route(ENDPOINT_PEERS, get(handle_peers))
            .route(ENDPOINT_SEARCH, get(handle_search))
            .route(ENDPOINT_INTERNAL_SEARCH, post(handle_internal_search))
            .route(ENDPOINT_FILES, get(handle_files))
            .route(ENDPOINT_STATUS, get(handle_status))
            .layer(Extension(self.config.clone()))
            .layer(Extension(self.registry.clone()))
            .layer(Extension(self.monitor.clone()))
            .layer(Extension(self.coordinator.clone()))
            .layer(Extension(self.index.clone()))
            .layer(Extension(self.announcer.clone()))
            .layer(Extension(StartedAt(self.started_at)))
            .layer(middleware::from_fn_with_state(
                self.limiter.clone(),
                rate_limit,
            ))
    }

    pub async fn bootstrap(&self) -> BootstrapReport {
        bootstrap_and_probe(
            &self.config,
            &self.registry,
            &self.monitor,
            self.announcer.as_ref(),
        )
        .await
    }

    /// Logs registry counts at a fixed period until the handle is aborted.
    pub fn spawn_stats_reporter(&self, every: Duration) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let name = self.config.name.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            loop {
                interval.tick().await;
                let stats = registry.stats();
                tracing::info!(
                    "{}: {} peers ({} healthy, {} suspect, {} dead)",
                    name,
                    stats.total_peers,
                    stats.healthy_peers,
                    stats.suspect_peers,
                    stats.dead_peers
                );
                for record in registry.list(None) {
                    tracing::debug!(
                        "  - {} {:?} failures={}",
                        record.url,
                        record.status,
                        record.consecutive_failures
                    );
                }
            }
        })
    }
}
