use super::protocol::{
    BootstrapResponse, PeerAnnouncer, PeerView, PeersQuery, PeersResponse, RegisterRequest,
    RegisterResponse,
};
use super::registry::PeerRegistry;
use super::types::{BootstrapReport, PeerStatus};
use crate::config::PeerConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::health::monitor::HealthMonitor;
use axum::extract::Query;
use axum::{Extension, Json};
use std::sync::Arc;

/// Another peer announces itself. The record is created (or refreshed) and
/// probed once right away so a live newcomer is usable immediately.
pub async fn handle_register(
    Extension(registry): Extension<Arc<PeerRegistry>>,
    Extension(monitor): Extension<Arc<HealthMonitor>>,
    Json(req): Json<RegisterRequest>,
) -> OverlayResult<Json<RegisterResponse>> {
    let record = registry.register(&req.url).map_err(|e| {
        tracing::warn!("Rejected registration of {:?}: {}", req.url, e);
        e
    })?;

    if monitor.probe_now(&record.url).await {
        tracing::debug!("Inline probe of {} succeeded", record.url);
    } else {
        tracing::debug!("Inline probe of {} failed, leaving it to the monitor", record.url);
    }

    Ok(Json(RegisterResponse {
        ok: true,
        peers: registry.healthy_urls(),
    }))
}

/// Announces this node to its configured friends.
pub async fn handle_bootstrap(
    Extension(config): Extension<Arc<PeerConfig>>,
    Extension(registry): Extension<Arc<PeerRegistry>>,
    Extension(monitor): Extension<Arc<HealthMonitor>>,
    Extension(announcer): Extension<Arc<dyn PeerAnnouncer>>,
) -> Json<BootstrapResponse> {
    let report = bootstrap_and_probe(&config, &registry, &monitor, announcer.as_ref()).await;

    Json(BootstrapResponse {
        ok: true,
        peer: config.name.clone(),
        registered: report.registered,
        failed: report.failed,
        known_peers: registry.healthy_urls(),
    })
}

/// Runs a bootstrap round and probes the friends that answered.
pub async fn bootstrap_and_probe(
    config: &PeerConfig,
    registry: &PeerRegistry,
    monitor: &HealthMonitor,
    announcer: &dyn PeerAnnouncer,
) -> BootstrapReport {
    let report = registry.bootstrap(&config.friends, announcer).await;
    for friend in &report.registered {
        monitor.probe_now(friend).await;
    }

    tracing::info!(
        "Bootstrap finished: {} registered, {} failed",
        report.registered.len(),
        report.failed.len()
    );
    report
}

pub async fn handle_peers(
    Query(params): Query<PeersQuery>,
    Extension(registry): Extension<Arc<PeerRegistry>>,
) -> OverlayResult<Json<PeersResponse>> {
    let filter = match params.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(PeerStatus::parse(raw).ok_or_else(|| {
            OverlayError::InvalidRequest(format!("unknown status filter {:?}", raw))
        })?),
    };

    let all_peers = registry
        .list(filter)
        .iter()
        .map(PeerView::from)
        .collect();

    Ok(Json(PeersResponse {
        peers: registry.healthy_urls(),
        all_peers,
        stats: registry.stats(),
    }))
}
