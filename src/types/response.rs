//! HTTP body type definitions
//!
//! Request and response bodies of the resolver's HTTP endpoints.

use serde::{Deserialize, Serialize};

use super::{
    attempt::AttemptEntry,
    identity::ProviderKind,
    request::{Category, MediaRequest},
};
use crate::{
    proxy::{PlayableUrl, ProxyStrategyBuilder},
    resolver::Resolution,
};

/// Body of `POST /resolve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    #[serde(flatten)]
    pub media: MediaRequest,
    /// Category to try first
    #[serde(default)]
    pub preferred_category: Option<Category>,
}

impl ResolveRequest {
    pub fn new(media: MediaRequest) -> Self {
        Self {
            media,
            preferred_category: None,
        }
    }

    pub fn with_preferred_category(mut self, category: Category) -> Self {
        self.preferred_category = Some(category);
        self
    }
}

/// Quality alternative from the same server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityOption {
    pub quality_label: String,
    pub playable: PlayableUrl,
}

/// Response of `POST /resolve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub provider: ProviderKind,
    pub category: Category,
    pub server: String,
    /// Highest ranked source, ready for the player
    pub selected: PlayableUrl,
    /// Remaining sources in rank order
    pub alternatives: Vec<QualityOption>,
    pub attempts: Vec<AttemptEntry>,
}

impl ResolveResponse {
    /// Wrap every ranked source of a resolution; `None` when it carries no sources
    pub fn from_resolution(resolution: Resolution, proxy: &ProxyStrategyBuilder) -> Option<Self> {
        let mut playables = resolution
            .sources
            .iter()
            .map(|source| proxy.build_playable_url(source));
        let selected = playables.next()?;
        let alternatives = playables
            .map(|playable| QualityOption {
                quality_label: playable.quality_label.clone(),
                playable,
            })
            .collect();

        Some(Self {
            provider: resolution.provider,
            category: resolution.category,
            server: resolution.server,
            selected,
            alternatives,
            attempts: resolution.attempts.entries().to_vec(),
        })
    }
}

/// Ping response for health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    /// Server uptime in seconds
    pub server_uptime: u64,

    /// Server version
    pub version: String,
}

impl PingResponse {
    /// Create a new ping response
    pub fn new(server_uptime: u64, version: impl Into<String>) -> Self {
        Self {
            server_uptime,
            version: version.into(),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Attempt diagnostics when every provider failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<AttemptEntry>>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            attempts: None,
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<AttemptEntry>) -> Self {
        self.attempts = Some(attempts);
        self
    }
}
