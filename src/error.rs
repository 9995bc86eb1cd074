//! Error taxonomy shared by the overlay subsystems.
//!
//! Only input-validation and admission-control failures ever reach a caller.
//! Per-peer failures (`PeerUnreachable`) are absorbed by the search and health
//! paths and only surface from direct, single-peer operations such as the
//! bootstrap handshake.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// Malformed URL or an attempt to register this peer with itself.
    #[error("invalid peer: {0}")]
    InvalidPeer(String),

    /// A request parameter the boundary could not interpret.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Admission control rejected the request for the current window.
    #[error("rate limit exceeded for {client}")]
    RateLimitExceeded { client: String, retry_after_secs: u64 },

    /// A remote peer could not be reached or answered with a failure.
    #[error("peer {url} unreachable: {reason}")]
    PeerUnreachable { url: String, reason: String },

    /// Startup configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type OverlayResult<T> = std::result::Result<T, OverlayError>;

impl OverlayError {
    pub fn unreachable(url: &str, reason: impl ToString) -> Self {
        Self::PeerUnreachable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPeer(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for OverlayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            Self::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = (
            status,
            Json(ErrorBody {
                ok: false,
                error: self.to_string(),
            }),
        )
            .into_response();

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}
