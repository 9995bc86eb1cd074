//! Unstructured Peer-to-Peer Overlay Library
//!
//! This library crate defines the core modules of a peer node. It serves as
//! the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`membership`**: The peer registry. Tracks known peers by URL together with
//!   their liveness, handles registration and bootstrap against seed friends.
//! - **`health`**: Periodic liveness probing that drives peers through
//!   `Healthy -> Suspect -> Dead` and back.
//! - **`search`**: Bounded flooding search (fanout-limited, TTL-bounded) with
//!   query-id duplicate suppression and partial-failure tolerant merging.
//! - **`ratelimit`**: Per-client fixed-window admission control in front of every endpoint.
//! - **`index`**: The local file index searched on every hop.
//! - **`node`**: Wiring of the above into an HTTP service, plus the outbound HTTP client.
//! - **`config`**: Validated startup configuration.

pub mod config;
pub mod error;
pub mod health;
pub mod index;
pub mod membership;
pub mod node;
pub mod ratelimit;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;
