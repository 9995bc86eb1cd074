use crate::config::PeerConfig;
use crate::membership::registry::PeerRegistry;
use crate::membership::types::RegistryStats;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;

/// Detailed status of this node.
pub const ENDPOINT_STATUS: &str = "/status";

/// Moment the node was assembled; used for uptime reporting.
#[derive(Debug, Clone, Copy)]
pub struct StartedAt(pub Instant);

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusConfig {
    pub bind_addr: String,
    pub shared_dir: PathBuf,
    pub search_ttl: u32,
    pub search_fanout: usize,
    pub max_fanout: usize,
    pub friends: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub peer: String,
    pub url: String,
    pub config: StatusConfig,
    pub stats: RegistryStats,
    pub healthy_peers: Vec<String>,
    pub uptime_secs: u64,
}

pub async fn handle_status(
    Extension(config): Extension<Arc<PeerConfig>>,
    Extension(registry): Extension<Arc<PeerRegistry>>,
    Extension(StartedAt(started_at)): Extension<StartedAt>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        peer: config.name.clone(),
        url: config.self_url.clone(),
        config: StatusConfig {
            bind_addr: config.bind_addr.to_string(),
            shared_dir: config.shared_dir.clone(),
            search_ttl: config.search_ttl,
            search_fanout: config.search_fanout,
            max_fanout: config.max_fanout,
            friends: config.friends.clone(),
        },
        stats: registry.stats(),
        healthy_peers: registry.healthy_urls(),
        uptime_secs: started_at.elapsed().as_secs(),
    })
}
