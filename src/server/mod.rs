//! HTTP server implementation
//!
//! Exposes one-shot resolution, the first-party referer proxy, health checks and cache
//! invalidation over HTTP.

pub mod app;
pub mod handlers;

pub use app::{AppState, create_app, router};
