//! Membership & Discovery Module
//!
//! Tracks the peers this node knows about and how alive they are.
//!
//! ## Core Mechanisms
//! - **Registration**: Peers announce themselves through `/register`; re-registration is an idempotent refresh.
//! - **Bootstrap**: On startup (and on demand) the node announces itself to its configured friends.
//! - **Liveness**: Records move between `Healthy`, `Suspect` and `Dead` as the health monitor reports probe outcomes.
//!   Dead peers stop receiving search traffic but stay in the table until a grace period has passed,
//!   so a peer that recovers is picked up again without a new bootstrap.

pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod types;
