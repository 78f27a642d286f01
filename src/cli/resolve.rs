//! One-shot resolution mode
//!
//! Resolves a single title, prints the playable source as JSON on stdout and exits. Logs go
//! to stderr so the output stays machine-readable.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::{
    config::ConfigLoader,
    proxy::ProxyStrategyBuilder,
    resolver::SourceOrchestrator,
    session::RequestToken,
    types::{Category, MediaRequest, ProviderKind, ResolveResponse},
};

/// Arguments for one-shot resolution
#[derive(Debug, Clone, Default)]
pub struct ResolveArgs {
    pub title: String,
    pub season: u32,
    pub episode: u32,
    pub movie: bool,
    pub canonical_id: Option<String>,
    pub provider: Option<ProviderKind>,
    pub category: Option<Category>,
    pub config: Option<PathBuf>,
}

impl ResolveArgs {
    /// Canonical request described by these arguments
    pub fn media_request(&self) -> MediaRequest {
        let mut request = if self.movie {
            MediaRequest::movie(&self.title)
        } else {
            MediaRequest::series(&self.title, self.season, self.episode)
        };
        if let Some(id) = &self.canonical_id {
            request = request.with_canonical_id(id);
        }
        if let Some(provider) = self.provider {
            request = request.with_provider_hint(provider);
        }
        request
    }
}

/// Resolve once and return the response that would be printed
pub async fn run_resolve_mode(args: &ResolveArgs) -> Result<ResolveResponse> {
    let settings = ConfigLoader::new()
        .load(args.config.as_deref())
        .context("failed to load configuration")?;
    let orchestrator = SourceOrchestrator::from_settings(&settings)?;
    let proxy = ProxyStrategyBuilder::new(&settings.proxy)?;

    let request = args.media_request();
    request.validate()?;
    tracing::debug!("Resolving {:?}", request);

    let resolution = orchestrator
        .obtain_sources(&request, args.category, &[], &RequestToken::detached())
        .await?;
    for entry in resolution.attempts.entries() {
        tracing::debug!("attempt: {:?}", entry);
    }

    ResolveResponse::from_resolution(resolution, &proxy)
        .context("resolution carries no playable sources")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_series_request_from_args() {
        let args = ResolveArgs {
            title: "Frieren".to_string(),
            season: 1,
            episode: 7,
            canonical_id: Some("209867".to_string()),
            provider: Some(ProviderKind::WatchId),
            ..ResolveArgs::default()
        };

        let request = args.media_request();
        let expected = MediaRequest::series("Frieren", 1, 7)
            .with_canonical_id("209867")
            .with_provider_hint(ProviderKind::WatchId);
        assert_eq!(request, expected);
    }

    #[test]
    fn test_movie_request_ignores_episode() {
        let args = ResolveArgs {
            title: "Perfect Blue".to_string(),
            movie: true,
            episode: 3,
            ..ResolveArgs::default()
        };

        assert_eq!(args.media_request(), MediaRequest::movie("Perfect Blue"));
    }

    #[tokio::test]
    async fn test_missing_title_is_rejected_before_resolving() {
        let args = ResolveArgs {
            season: 1,
            episode: 1,
            ..ResolveArgs::default()
        };

        assert!(run_resolve_mode(&args).await.is_err());
    }
}
