//! In-process stand-ins for the node's outbound collaborators.
//!
//! `SimNetwork` wires several search coordinators together without sockets so
//! flooding behaviour can be observed hop by hop.

use crate::error::{OverlayError, OverlayResult};
use crate::health::probe::LivenessProbe;
use crate::index::memory::MemoryIndex;
use crate::membership::protocol::PeerAnnouncer;
use crate::membership::registry::PeerRegistry;
use crate::search::coordinator::{SearchCoordinator, SearchSettings};
use crate::search::forwarder::QueryForwarder;
use crate::search::types::{SearchRequest, SearchResult};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

pub fn peer_url(n: usize) -> String {
    format!("http://peer{}.test:8000", n)
}

// ============================================================
// LIVENESS PROBE
// ============================================================

/// Probe whose answers are set per peer: up (default), down or hanging.
#[derive(Default)]
pub struct ScriptedProbe {
    down: DashSet<String>,
    hanging: DashSet<String>,
    calls: DashMap<String, usize>,
}

impl ScriptedProbe {
    pub fn set_down(&self, url: &str, down: bool) {
        if down {
            self.down.insert(url.to_string());
        } else {
            self.down.remove(url);
        }
    }

    pub fn set_hanging(&self, url: &str) {
        self.hanging.insert(url.to_string());
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url).map(|c| *c.value()).unwrap_or(0)
    }
}

#[async_trait]
impl LivenessProbe for ScriptedProbe {
    async fn probe(&self, url: &str) -> OverlayResult<()> {
        *self.calls.entry(url.to_string()).or_insert(0) += 1;

        if self.hanging.contains(url) {
            std::future::pending::<()>().await;
        }
        if self.down.contains(url) {
            return Err(OverlayError::unreachable(url, "scripted down"));
        }
        Ok(())
    }
}

// ============================================================
// BOOTSTRAP ANNOUNCER
// ============================================================

#[derive(Default)]
pub struct RecordingAnnouncer {
    refuse: DashSet<String>,
    announced: Mutex<Vec<(String, String)>>,
}

impl RecordingAnnouncer {
    pub fn refuse(&self, friend_url: &str) {
        self.refuse.insert(friend_url.to_string());
    }

    /// `(friend, announced self url)` pairs in call order.
    pub fn announced(&self) -> Vec<(String, String)> {
        self.announced.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerAnnouncer for RecordingAnnouncer {
    async fn announce(&self, friend_url: &str, self_url: &str) -> OverlayResult<()> {
        self.announced
            .lock()
            .unwrap()
            .push((friend_url.to_string(), self_url.to_string()));

        if self.refuse.contains(friend_url) {
            return Err(OverlayError::unreachable(friend_url, "connection refused"));
        }
        Ok(())
    }
}

// ============================================================
// SIMULATED OVERLAY
// ============================================================

/// A set of peers that relay queries to each other through direct calls.
#[derive(Default)]
pub struct SimNetwork {
    nodes: DashMap<String, Arc<SearchCoordinator>>,
    unreachable: DashSet<String>,
    hanging: DashSet<String>,
    forwards: Mutex<Vec<(String, SearchRequest)>>,
}

impl SimNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds peer `n` serving `files` with default search settings.
    pub fn add_peer(self: &Arc<Self>, n: usize, files: &[&str]) -> Arc<PeerRegistry> {
        self.add_peer_with(n, files, SearchSettings::default())
    }

    pub fn add_peer_with(
        self: &Arc<Self>,
        n: usize,
        files: &[&str],
        settings: SearchSettings,
    ) -> Arc<PeerRegistry> {
        let url = peer_url(n);
        let registry = PeerRegistry::new(&url).unwrap();
        let coordinator = SearchCoordinator::new(
            registry.clone(),
            Arc::new(MemoryIndex::with_names(files)),
            self.clone(),
            settings,
        );
        self.nodes.insert(url, coordinator);
        registry
    }

    pub fn coordinator(&self, n: usize) -> Arc<SearchCoordinator> {
        self.nodes.get(&peer_url(n)).unwrap().value().clone()
    }

    pub fn set_unreachable(&self, n: usize) {
        self.unreachable.insert(peer_url(n));
    }

    pub fn set_hanging(&self, n: usize) {
        self.hanging.insert(peer_url(n));
    }

    pub fn forwards(&self) -> Vec<(String, SearchRequest)> {
        self.forwards.lock().unwrap().clone()
    }

    pub fn forward_count(&self) -> usize {
        self.forwards.lock().unwrap().len()
    }

    /// Distinct peers that received at least one relay.
    pub fn relay_targets(&self) -> BTreeSet<String> {
        self.forwards().into_iter().map(|(url, _)| url).collect()
    }

    pub fn clear_forwards(&self) {
        self.forwards.lock().unwrap().clear();
    }
}

#[async_trait]
impl QueryForwarder for SimNetwork {
    async fn forward(
        &self,
        peer_url: &str,
        request: SearchRequest,
    ) -> OverlayResult<Vec<SearchResult>> {
        self.forwards
            .lock()
            .unwrap()
            .push((peer_url.to_string(), request.clone()));

        if self.hanging.contains(peer_url) {
            std::future::pending::<()>().await;
        }
        if self.unreachable.contains(peer_url) {
            return Err(OverlayError::unreachable(peer_url, "connection refused"));
        }

        let node = self
            .nodes
            .get(peer_url)
            .map(|node| node.value().clone())
            .ok_or_else(|| OverlayError::unreachable(peer_url, "no such peer"))?;

        Ok(node.search(request).await)
    }
}

/// Registers `a` and `b` with each other and marks both links healthy.
pub fn link(a: &PeerRegistry, b: &PeerRegistry) {
    a.register(b.self_url()).unwrap();
    b.register(a.self_url()).unwrap();
    a.record_success(b.self_url());
    b.record_success(a.self_url());
}
