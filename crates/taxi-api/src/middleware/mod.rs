//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`metrics`]: Prometheus request metrics and the `/metrics` scrape handler.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly, and the
//! login-required check lives in [`crate::auth`].

pub mod metrics;
