//! Source ranking and fallback
//!
//! Drives the adapters sequentially: provider try-order, then category order, then servers in
//! provider order. The first server whose source set contains an adaptive manifest wins.
//! Every failure along the way is recorded in the attempt log, which becomes the diagnostic
//! payload of `ResolutionExhausted` if nothing wins.

use std::sync::Arc;

use super::{identity::IdentifierResolver, retry::RetryPolicy};
use crate::{
    Error, Result,
    config::Settings,
    providers::{ProviderAdapter, build_adapters},
    session::RequestToken,
    types::{
        CandidateSource, Category, MediaRequest, ProviderIdentity, ProviderKind,
        ResolutionAttemptLog, ServerSources, Track,
    },
};

/// Winning server set of one resolution pass
#[derive(Debug, Clone)]
pub struct Resolution {
    pub provider: ProviderKind,
    pub category: Category,
    pub server: String,
    pub identity: ProviderIdentity,
    /// Ranked, best first
    pub sources: Vec<CandidateSource>,
    pub tracks: Vec<Track>,
    pub attempts: ResolutionAttemptLog,
}

impl Resolution {
    pub fn best(&self) -> Option<&CandidateSource> {
        self.sources.first()
    }

    /// Source with the given quality label, if the set has one
    pub fn quality(&self, label: &str) -> Option<&CandidateSource> {
        self.sources.iter().find(|s| s.quality_label == label)
    }
}

/// Order sources adaptive first, then 1080, 720, 360, other labels, `auto`.
///
/// The sort is stable so provider order breaks remaining ties.
pub fn rank_sources(mut sources: Vec<CandidateSource>) -> Vec<CandidateSource> {
    sources.sort_by_key(|s| (!s.is_adaptive(), s.quality_rank()));
    sources
}

/// Category order: preferred first, then the fixed priority, limited to what the provider serves
pub fn category_order(preferred: Option<Category>, supported: &[Category]) -> Vec<Category> {
    preferred
        .into_iter()
        .chain(Category::PRIORITY)
        .filter(|c| supported.contains(c))
        .fold(Vec::new(), |mut order, c| {
            if !order.contains(&c) {
                order.push(c);
            }
            order
        })
}

#[derive(Debug)]
pub struct SourceOrchestrator {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    resolver: IdentifierResolver,
    retry: RetryPolicy,
}

impl SourceOrchestrator {
    /// `adapters` are in configured priority order
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>, retry: RetryPolicy) -> Self {
        Self {
            adapters,
            resolver: IdentifierResolver::new(),
            retry,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            build_adapters(settings)?,
            RetryPolicy::from_settings(&settings.retry),
        ))
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    /// Hint first, then configured priority, skipping excluded providers
    pub fn try_order(
        &self,
        hint: Option<ProviderKind>,
        excluded: &[ProviderKind],
    ) -> Vec<Arc<dyn ProviderAdapter>> {
        let hinted = hint.and_then(|kind| self.adapters.iter().find(|a| a.kind() == kind));
        hinted
            .into_iter()
            .chain(self.adapters.iter().filter(|a| Some(a.kind()) != hint))
            .filter(|a| !excluded.contains(&a.kind()))
            .cloned()
            .collect()
    }

    /// Find the first usable source set for `request`
    pub async fn obtain_sources(
        &self,
        request: &MediaRequest,
        preferred_category: Option<Category>,
        excluded: &[ProviderKind],
        token: &RequestToken,
    ) -> Result<Resolution> {
        self.run_pass(request, excluded, token, |adapter| {
            category_order(preferred_category, adapter.categories())
        })
        .await
    }

    /// Like [`obtain_sources`](Self::obtain_sources) but without category fallback
    pub async fn obtain_category(
        &self,
        request: &MediaRequest,
        category: Category,
        token: &RequestToken,
    ) -> Result<Resolution> {
        self.run_pass(request, &[], token, |adapter| {
            if adapter.categories().contains(&category) {
                vec![category]
            } else {
                Vec::new()
            }
        })
        .await
    }

    async fn run_pass<F>(
        &self,
        request: &MediaRequest,
        excluded: &[ProviderKind],
        token: &RequestToken,
        categories_for: F,
    ) -> Result<Resolution>
    where
        F: Fn(&dyn ProviderAdapter) -> Vec<Category>,
    {
        request.validate()?;
        token.check()?;
        self.resolver.select_title(&request.title_key()).await;

        let mut attempts = ResolutionAttemptLog::new();
        for adapter in self.try_order(request.provider_hint, excluded) {
            let kind = adapter.kind();

            let categories = categories_for(adapter.as_ref());
            if categories.is_empty() {
                attempts.record_error(kind, None, None, "no matching category");
                continue;
            }

            let identity = self
                .resolver
                .resolve(request, adapter.as_ref(), &self.retry)
                .await;
            token.check()?;
            let identity = match identity {
                Ok(identity) => identity,
                Err(err) => {
                    tracing::debug!("{}: identity resolution failed: {}", kind, err);
                    attempts.record_error(kind, None, None, err.to_string());
                    continue;
                }
            };

            for category in categories {
                if let Some(set) = self
                    .try_category(adapter.as_ref(), &identity, category, token, &mut attempts)
                    .await?
                {
                    attempts.record_success(
                        kind,
                        Some(category),
                        Some(&set.server),
                        format!("{} sources", set.sources.len()),
                    );
                    tracing::info!(
                        "Resolved {} via {}/{}/{}",
                        request.resume_key(),
                        kind,
                        category,
                        set.server
                    );
                    return Ok(Resolution {
                        provider: kind,
                        category,
                        server: set.server,
                        identity,
                        sources: rank_sources(set.sources),
                        tracks: set.tracks,
                        attempts,
                    });
                }
            }
        }

        tracing::warn!(
            "No playable source for {} after {} attempts",
            request.resume_key(),
            attempts.len()
        );
        Err(Error::ResolutionExhausted { attempts })
    }

    /// Servers of one category in provider order; `Ok(None)` when none produced a manifest
    async fn try_category(
        &self,
        adapter: &dyn ProviderAdapter,
        identity: &ProviderIdentity,
        category: Category,
        token: &RequestToken,
        attempts: &mut ResolutionAttemptLog,
    ) -> Result<Option<ServerSources>> {
        let kind = adapter.kind();

        let label = format!("{}/{} servers", kind, category);
        let servers = self
            .retry
            .run(&label, || adapter.list_servers(identity, category))
            .await;
        token.check()?;
        let servers = match servers {
            Ok(servers) if servers.is_empty() => {
                attempts.record_error(kind, Some(category), None, "no servers listed");
                return Ok(None);
            }
            Ok(servers) => servers,
            Err(err) => {
                attempts.record_error(kind, Some(category), None, err.to_string());
                return Ok(None);
            }
        };

        for server in servers {
            let label = format!("{}/{}/{} sources", kind, category, server);
            let fetched = self
                .retry
                .run(&label, || adapter.get_sources(identity, category, &server))
                .await;
            token.check()?;
            match fetched {
                Ok(set) if set.has_adaptive() => return Ok(Some(set)),
                Ok(set) => {
                    let message = if set.sources.is_empty() {
                        "no sources".to_string()
                    } else {
                        format!("{} direct-only sources", set.sources.len())
                    };
                    attempts.record_error(kind, Some(category), Some(&server), message);
                }
                Err(err) => {
                    tracing::debug!("{}: {}", label, err);
                    attempts.record_error(kind, Some(category), Some(&server), err.to_string());
                }
            }
        }
        Ok(None)
    }
}
