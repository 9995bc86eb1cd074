use crate::config::PeerConfig;
use crate::membership::registry::PeerRegistry;
use crate::membership::types::RegistryStats;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub peer: String,
    pub url: String,
    pub stats: RegistryStats,
}

/// Liveness receiver probed by other peers' health monitors.
pub async fn handle_health(
    Extension(config): Extension<Arc<PeerConfig>>,
    Extension(registry): Extension<Arc<PeerRegistry>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        peer: config.name.clone(),
        url: config.self_url.clone(),
        stats: registry.stats(),
    })
}
