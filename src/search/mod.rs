//! Distributed Search Module
//!
//! Resolves file-name queries across the overlay by bounded flooding.
//!
//! ## Overview
//! A query is answered from the local index and relayed to at most `fanout`
//! neighbours, each of which repeats the process with one hop less until the
//! hop budget (`ttl`) is spent. Every query carries an id; a peer answers a
//! given id only once, which keeps cyclic friend graphs from amplifying it.
//!
//! ## Submodules
//! - **`coordinator`**: Local lookup, target selection, concurrent relay and result merging.
//! - **`dedup`**: Expiring record of query ids already handled.
//! - **`forwarder`**: The outbound relay seam and endpoint paths.
//! - **`handlers`**: HTTP request handlers for the Axum web server.
//! - **`types`**: Data Transfer Objects for queries and results.

pub mod coordinator;
pub mod dedup;
pub mod forwarder;
pub mod handlers;
pub mod types;
