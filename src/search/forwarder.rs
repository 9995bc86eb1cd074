use crate::error::OverlayResult;
use async_trait::async_trait;

use super::types::{SearchRequest, SearchResult};

/// Public search entry point.
pub const ENDPOINT_SEARCH: &str = "/search";
/// Peer-to-peer relay of a query that is already in flight.
pub const ENDPOINT_INTERNAL_SEARCH: &str = "/internal/search";
/// Listing of the local index.
pub const ENDPOINT_FILES: &str = "/files";

/// Sends a query one hop further and returns everything the remote peer
/// (and its own downstream) found.
#[async_trait]
pub trait QueryForwarder: Send + Sync {
    async fn forward(&self, peer_url: &str, request: SearchRequest)
    -> OverlayResult<Vec<SearchResult>>;
}
