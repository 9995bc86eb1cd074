use crate::error::OverlayError;
use crate::health::probe::ENDPOINT_HEALTH;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use super::limiter::{Admission, RateLimiter};

/// Key used when the transport did not record a peer address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Admission gate in front of every route except the liveness receiver.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == ENDPOINT_HEALTH {
        return next.run(request).await;
    }

    let client = client_key(&request);
    match limiter.check(&client) {
        Admission::Allow { .. } => next.run(request).await,
        Admission::Deny { retry_after } => {
            tracing::warn!(
                "Throttled {} on {} (retry in {:?})",
                client,
                request.uri().path(),
                retry_after
            );
            OverlayError::RateLimitExceeded {
                client,
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
