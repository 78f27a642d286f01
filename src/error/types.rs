//! Error type definitions
//!
//! Defines the error taxonomy shared by provider adapters, the orchestrator,
//! the proxy layer and the playback session.

use crate::types::{ProviderKind, ResolutionAttemptLog};
use thiserror::Error;

/// Main error type for the resolver
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity resolution failed for a provider
    #[error("{provider}: not found ({reason})")]
    NotFound {
        provider: ProviderKind,
        reason: String,
    },

    /// 502/503 or timeout from an upstream endpoint
    #[error("{provider}: transient upstream failure ({detail})")]
    TransientUpstream {
        provider: ProviderKind,
        detail: String,
    },

    /// Any other non-success upstream response
    #[error("{provider}: upstream returned {status} ({detail})")]
    Upstream {
        provider: ProviderKind,
        status: u16,
        detail: String,
    },

    /// Every provider/category/server combination failed
    #[error("No playable source found: {}", attempts.summary())]
    ResolutionExhausted { attempts: ResolutionAttemptLog },

    /// A newer request replaced the one this result belonged to
    #[error("Request superseded by a newer selection")]
    Superseded,

    /// Unrecoverable playback engine error
    #[error("Playback failed on {provider}: {detail}")]
    PlaybackFatal {
        provider: ProviderKind,
        detail: String,
    },

    /// Session warm-up failure
    #[error("Session bootstrap failed: {0}")]
    Bootstrap(String),

    /// Playback engine contract violations
    #[error("Playback engine error: {0}")]
    Engine(String),

    /// Malformed inbound request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not-found error for a provider
    pub fn not_found(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self::NotFound {
            provider,
            reason: reason.into(),
        }
    }

    /// Create a transient upstream error
    pub fn transient(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::TransientUpstream {
            provider,
            detail: detail.into(),
        }
    }

    /// Create a non-transient upstream error
    pub fn upstream(provider: ProviderKind, status: u16, detail: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status,
            detail: detail.into(),
        }
    }

    /// Create a playback fatal error
    pub fn playback_fatal(provider: ProviderKind, detail: impl Into<String>) -> Self {
        Self::PlaybackFatal {
            provider,
            detail: detail.into(),
        }
    }

    /// Create a bootstrap error
    pub fn bootstrap(msg: impl Into<String>) -> Self {
        Self::Bootstrap(msg.into())
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure is eligible for the bounded retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransientUpstream { .. } => true,
            Self::Network(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Whether the error should reach the user rather than be absorbed by fallback.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::ResolutionExhausted { .. } | Self::PlaybackFatal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test config error");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: test config error");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found(ProviderKind::WatchId, "no search results");
        assert_eq!(err.to_string(), "watch_id: not found (no search results)");
        assert!(!err.is_transient());
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::transient(ProviderKind::TitleSearch, "503").is_transient());
        assert!(!Error::upstream(ProviderKind::TitleSearch, 404, "gone").is_transient());
        assert!(!Error::upstream(ProviderKind::TitleSearch, 500, "boom").is_transient());
    }

    #[test]
    fn test_user_facing_kinds() {
        let exhausted = Error::ResolutionExhausted {
            attempts: ResolutionAttemptLog::new(),
        };
        assert!(exhausted.is_user_facing());
        assert!(Error::playback_fatal(ProviderKind::EpisodeSession, "codec").is_user_facing());
        assert!(!Error::bootstrap("landing page 403").is_user_facing());
        assert!(!Error::Superseded.is_user_facing());
    }

    #[test]
    fn test_exhausted_message_carries_attempts() {
        let mut attempts = ResolutionAttemptLog::new();
        attempts.record_error(ProviderKind::WatchId, None, None, "search empty");
        let err = Error::ResolutionExhausted { attempts };
        assert!(err.to_string().contains("search empty"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: Error = toml_err.into();
        assert!(matches!(err, Error::Toml(_)));
    }
}
