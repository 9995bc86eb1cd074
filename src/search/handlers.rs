use super::coordinator::SearchCoordinator;
use super::types::{
    FilesResponse, ForwardResponse, SearchParams, SearchRequest, SearchResponse,
};
use crate::config::PeerConfig;
use crate::index::LocalIndex;
use axum::extract::Query;
use axum::{Extension, Json};
use std::sync::Arc;

/// Starts a new flooding query on behalf of a client.
pub async fn handle_search(
    Query(params): Query<SearchParams>,
    Extension(config): Extension<Arc<PeerConfig>>,
    Extension(coordinator): Extension<Arc<SearchCoordinator>>,
) -> Json<SearchResponse> {
    let ttl = params.ttl.unwrap_or(config.search_ttl);
    let fanout = params.fanout.unwrap_or(config.search_fanout);
    let request = SearchRequest::new(&params.query, ttl, fanout);
    let query_id = request.query_id.clone();

    tracing::info!(
        "Search {:?} (ttl={}, fanout={}) as query {}",
        params.query,
        ttl,
        fanout,
        query_id
    );

    let results = coordinator.search(request).await;

    Json(SearchResponse {
        query: params.query,
        query_id,
        ttl,
        fanout_used: coordinator.effective_fanout(fanout),
        count: results.len(),
        results,
    })
}

/// Continues a query relayed by another peer.
pub async fn handle_internal_search(
    Extension(coordinator): Extension<Arc<SearchCoordinator>>,
    Json(request): Json<SearchRequest>,
) -> Json<ForwardResponse> {
    tracing::debug!(
        "Relayed query {} (ttl={}, visited={})",
        request.query_id,
        request.ttl,
        request.visited.len()
    );

    let query_id = request.query_id.clone();
    let results = coordinator.search(request).await;

    Json(ForwardResponse { query_id, results })
}

pub async fn handle_files(
    Extension(config): Extension<Arc<PeerConfig>>,
    Extension(index): Extension<Arc<dyn LocalIndex>>,
) -> Json<FilesResponse> {
    Json(FilesResponse {
        peer: config.name.clone(),
        base: config.self_url.clone(),
        files: index.entries(),
    })
}
