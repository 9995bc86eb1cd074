//! Outbound HTTP Peer Client
//!
//! One `reqwest` client serves every outbound concern of the node: liveness
//! probes, query relays and the bootstrap handshake. Each request carries its
//! own timeout; the handshake additionally retries with jittered backoff.

use crate::config::PeerConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::health::probe::{ENDPOINT_HEALTH, LivenessProbe};
use crate::membership::protocol::{ENDPOINT_REGISTER, PeerAnnouncer, RegisterRequest};
use crate::search::forwarder::{ENDPOINT_INTERNAL_SEARCH, QueryForwarder};
use crate::search::types::{ForwardResponse, SearchRequest, SearchResult};

use async_trait::async_trait;
use std::time::Duration;

const ANNOUNCE_ATTEMPTS: usize = 3;
const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpPeerClient {
    http: reqwest::Client,
    probe_timeout: Duration,
    forward_timeout: Duration,
}

impl HttpPeerClient {
    pub fn new(config: &PeerConfig) -> OverlayResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("peer-overlay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OverlayError::Config(format!("cannot build http client: {}", e)))?;

        Ok(Self {
            http,
            probe_timeout: config.health.probe_timeout(),
            forward_timeout: config.forward_timeout(),
        })
    }

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: &str,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut delay_ms = 150u64;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self
                .http
                .post(url)
                .json(payload)
                .timeout(timeout)
                .send()
                .await
            {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::debug!("POST {} failed (attempt {}): {}", url, attempt, e);
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }
    }
}

#[async_trait]
impl LivenessProbe for HttpPeerClient {
    async fn probe(&self, url: &str) -> OverlayResult<()> {
        let response = self
            .http
            .get(format!("{}{}", url, ENDPOINT_HEALTH))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| OverlayError::unreachable(url, e))?;

        if !response.status().is_success() {
            return Err(OverlayError::unreachable(
                url,
                format!("health answered {}", response.status()),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl QueryForwarder for HttpPeerClient {
    async fn forward(
        &self,
        peer_url: &str,
        request: SearchRequest,
    ) -> OverlayResult<Vec<SearchResult>> {
        let response = self
            .http
            .post(format!("{}{}", peer_url, ENDPOINT_INTERNAL_SEARCH))
            .json(&request)
            .timeout(request.budget().map_or(self.forward_timeout, |budget| {
                budget.max(self.forward_timeout)
            }))
            .send()
            .await
            .map_err(|e| OverlayError::unreachable(peer_url, e))?;

        if !response.status().is_success() {
            return Err(OverlayError::unreachable(
                peer_url,
                format!("relay answered {}", response.status()),
            ));
        }

        let reply: ForwardResponse = response
            .json()
            .await
            .map_err(|e| OverlayError::unreachable(peer_url, format!("bad relay reply: {}", e)))?;

        if reply.query_id != request.query_id {
            return Err(OverlayError::unreachable(
                peer_url,
                format!("reply for query {} instead of {}", reply.query_id, request.query_id),
            ));
        }

        Ok(reply.results)
    }
}

#[async_trait]
impl PeerAnnouncer for HttpPeerClient {
    async fn announce(&self, friend_url: &str, self_url: &str) -> OverlayResult<()> {
        let payload = RegisterRequest {
            url: self_url.to_string(),
        };
        let response = self
            .post_with_retry(
                &format!("{}{}", friend_url, ENDPOINT_REGISTER),
                &payload,
                ANNOUNCE_TIMEOUT,
                ANNOUNCE_ATTEMPTS,
            )
            .await
            .map_err(|e| OverlayError::unreachable(friend_url, e))?;

        if !response.status().is_success() {
            return Err(OverlayError::unreachable(
                friend_url,
                format!("register answered {}", response.status()),
            ));
        }

        Ok(())
    }
}
