use crate::error::OverlayResult;
use async_trait::async_trait;

/// Endpoint every peer exposes for liveness probes.
pub const ENDPOINT_HEALTH: &str = "/health";

/// Asks a remote peer whether it is alive.
///
/// Implementations report any transport failure or non-success answer as
/// `OverlayError::PeerUnreachable`. The monitor applies its own timeout on
/// top, so implementations may block for as long as their transport allows.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, url: &str) -> OverlayResult<()>;
}
