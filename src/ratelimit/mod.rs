//! Admission Control Module
//!
//! Fixed-window, per-client request limiting applied before any other
//! component sees a request. It knows nothing about search or membership;
//! a throttled request is answered with `429 Too Many Requests`.

pub mod limiter;
pub mod middleware;
