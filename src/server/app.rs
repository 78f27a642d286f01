//! Axum application setup
//!
//! Creates and configures the Axum application with routes and middleware.

use crate::{
    Result,
    config::Settings,
    proxy::ProxyStrategyBuilder,
    resolver::SourceOrchestrator,
};
use axum::{
    Router,
    routing::{get, post},
};
use reqwest::Client;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Provider fallback driver
    pub orchestrator: Arc<SourceOrchestrator>,
    /// Wraps resolved sources for the player
    pub proxy: Arc<ProxyStrategyBuilder>,
    /// Client used by the `/proxy` endpoint
    pub upstream: Client,
    /// Application settings
    pub settings: Arc<Settings>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let orchestrator = SourceOrchestrator::from_settings(&settings)?;
        Self::with_orchestrator(settings, orchestrator)
    }

    /// State around an already assembled orchestrator
    pub fn with_orchestrator(settings: Settings, orchestrator: SourceOrchestrator) -> Result<Self> {
        let upstream = Client::builder()
            .user_agent(settings.providers.user_agent.clone())
            .timeout(settings.server.timeout())
            .build()?;

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            proxy: Arc::new(ProxyStrategyBuilder::new(&settings.proxy)?),
            upstream,
            settings: Arc::new(settings),
            start_time: std::time::Instant::now(),
        })
    }
}

/// Create the main Axum application with routes and middleware
pub fn create_app(settings: Settings) -> Result<Router> {
    Ok(router(AppState::new(settings)?))
}

/// Routes and middleware around a prepared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/resolve", post(super::handlers::resolve))
        .route("/proxy", get(super::handlers::proxy))
        .route("/ping", get(super::handlers::ping))
        .route(
            "/invalidate_caches",
            post(super::handlers::invalidate_caches),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
