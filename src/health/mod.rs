//! Health Monitoring Module
//!
//! Keeps the registry's view of which peers are usable as search targets.
//!
//! ## Submodules
//! - **`monitor`**: The periodic probe loop and the per-peer failure state machine.
//! - **`probe`**: The outbound liveness-probe seam.
//! - **`handlers`**: The `/health` endpoint other peers probe.

pub mod handlers;
pub mod monitor;
pub mod probe;

#[cfg(test)]
mod tests;
