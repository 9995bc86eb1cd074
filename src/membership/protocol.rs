//! Membership Network Protocol
//!
//! Endpoints and Data Transfer Objects used for peer registration and
//! discovery. All payloads travel as JSON over HTTP.

use crate::error::OverlayResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{PeerRecord, PeerStatus, RegistryStats};

// --- API Endpoints ---

/// A peer announces itself to another peer.
pub const ENDPOINT_REGISTER: &str = "/register";
/// Triggers a bootstrap round against the configured friends.
pub const ENDPOINT_BOOTSTRAP: &str = "/bootstrap";
/// Lists the peers this node knows about.
pub const ENDPOINT_PEERS: &str = "/peers";

// --- Data Transfer Objects ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub ok: bool,
    /// Healthy peers known to the receiving node.
    pub peers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub ok: bool,
    pub peer: String,
    pub registered: Vec<String>,
    pub failed: Vec<String>,
    pub known_peers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PeersQuery {
    pub status: Option<String>,
}

/// Serializable snapshot of a [`PeerRecord`].
///
/// Monotonic instants are meaningless to another process, so ages are
/// reported in whole seconds relative to the moment of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerView {
    pub url: String,
    pub status: PeerStatus,
    pub consecutive_failures: u32,
    pub known_for_secs: u64,
    pub last_seen_secs_ago: u64,
}

impl From<&PeerRecord> for PeerView {
    fn from(record: &PeerRecord) -> Self {
        Self {
            url: record.url.clone(),
            status: record.status,
            consecutive_failures: record.consecutive_failures,
            known_for_secs: record.first_seen.elapsed().as_secs(),
            last_seen_secs_ago: record.last_seen.elapsed().as_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeersResponse {
    /// URLs of healthy peers.
    pub peers: Vec<String>,
    pub all_peers: Vec<PeerView>,
    pub stats: RegistryStats,
}

/// Outbound half of the bootstrap handshake: tells `friend_url` that
/// `self_url` exists.
#[async_trait]
pub trait PeerAnnouncer: Send + Sync {
    async fn announce(&self, friend_url: &str, self_url: &str) -> OverlayResult<()>;
}
