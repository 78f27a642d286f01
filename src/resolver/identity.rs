//! Identifier resolution
//!
//! Maps a canonical [`MediaRequest`] to the native identifiers of one provider. Deep links are
//! used verbatim; otherwise the first search hit is taken and its episode list fetched, with a
//! season renumbering pass for providers that list later seasons with continued numbering.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::retry::RetryPolicy;
use crate::{
    Error, Result,
    providers::ProviderAdapter,
    types::{EpisodeEntry, IdentityScheme, MediaKind, MediaRequest, ProviderIdentity, ProviderKind},
};

/// Episode counts of a conventional broadcast season
pub const SEASON_LENGTHS: [usize; 5] = [12, 13, 24, 25, 26];

static SEASON_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:season\s*\d+|\d+(?:st|nd|rd|th)\s+season|part\s*\d+|s\d{1,2})\b")
        .expect("season marker regex should compile")
});

/// Whether a title names a later season or part
pub fn has_season_marker(title: &str) -> bool {
    SEASON_MARKER.is_match(title)
}

/// Renumber a continued-numbering season slice to start at 1.
///
/// Applies when the list starts above 1 and either its length is a conventional season length
/// or `season_marker` is set. The provider number is kept in `original_number`. Lists that
/// already carry an original number are returned unchanged.
pub fn remap_season_numbering(episodes: Vec<EpisodeEntry>, season_marker: bool) -> Vec<EpisodeEntry> {
    if episodes.iter().any(|e| e.original_number.is_some()) {
        return episodes;
    }
    let Some(first) = episodes.iter().map(|e| e.number).min() else {
        return episodes;
    };
    if first <= 1 || !(SEASON_LENGTHS.contains(&episodes.len()) || season_marker) {
        return episodes;
    }

    let offset = first - 1;
    tracing::debug!("Renumbering {} episodes starting at {}", episodes.len(), first);
    episodes
        .into_iter()
        .map(|mut entry| {
            entry.original_number = Some(entry.number);
            entry.number -= offset;
            entry
        })
        .collect()
}

/// Search hit plus its (possibly renumbered) episode list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLookup {
    pub series_id: String,
    pub title: String,
    pub episodes: Vec<EpisodeEntry>,
}

impl SeriesLookup {
    fn find(&self, number: u32) -> Option<&EpisodeEntry> {
        self.episodes.iter().find(|e| e.number == number)
    }
}

/// Lookups are keyed by title as well as provider; concurrent requests for different titles
/// share one resolver and must never see each other's series.
#[derive(Debug, Default)]
struct SeriesCache {
    title_key: Option<String>,
    entries: HashMap<(String, ProviderKind), Arc<SeriesLookup>>,
}

/// Resolves provider identities, caching series lookups for the selected title
#[derive(Debug, Default)]
pub struct IdentifierResolver {
    cache: RwLock<SeriesCache>,
}

impl IdentifierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the cache to a title, dropping lookups of any other title
    ///
    /// ```rust
    /// use playback_resolver::resolver::IdentifierResolver;
    ///
    /// # tokio_test::block_on(async {
    /// let resolver = IdentifierResolver::new();
    /// resolver.select_title("title:frieren").await;
    /// assert!(resolver.cached_providers().await.is_empty());
    /// # });
    /// ```
    pub async fn select_title(&self, title_key: &str) {
        let mut cache = self.cache.write().await;
        if cache.title_key.as_deref() != Some(title_key) {
            if cache.title_key.is_some() {
                tracing::debug!("Title changed to {}, clearing series cache", title_key);
            }
            cache.entries.retain(|(key, _), _| key == title_key);
            cache.title_key = Some(title_key.to_string());
        }
    }

    /// Drop every cached lookup
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.entries.clear();
        cache.title_key = None;
    }

    /// Providers with a cached lookup for the selected title
    pub async fn cached_providers(&self) -> Vec<ProviderKind> {
        let cache = self.cache.read().await;
        let Some(selected) = cache.title_key.as_deref() else {
            return Vec::new();
        };
        let mut kinds: Vec<_> = cache
            .entries
            .keys()
            .filter(|(key, _)| key == selected)
            .map(|(_, kind)| *kind)
            .collect();
        kinds.sort();
        kinds
    }

    /// Native identity of `request` on `adapter`, or `NotFound`
    pub async fn resolve(
        &self,
        request: &MediaRequest,
        adapter: &dyn ProviderAdapter,
        retry: &RetryPolicy,
    ) -> Result<ProviderIdentity> {
        let kind = adapter.kind();

        let linked_episode = request
            .deep_link(kind)
            .and_then(|link| link.episode_id.as_ref().map(|ep| (&link.series_id, ep)));
        if let Some((series_id, episode_id)) = linked_episode {
            tracing::debug!("{}: using deep-linked episode {}", kind, episode_id);
            return Ok(ProviderIdentity::new(kind, series_id, episode_id)
                .with_media(request.media_kind, request.season)
                .with_episode(&EpisodeEntry::new(request.episode, episode_id))
                .with_note("deep link"));
        }

        if adapter.identity_scheme() == IdentityScheme::CanonicalId {
            let id = request
                .canonical_id
                .as_deref()
                .ok_or_else(|| Error::not_found(kind, "request has no catalog id"))?;
            return Ok(ProviderIdentity::new(kind, id, id)
                .with_media(request.media_kind, request.season)
                .with_episode(&EpisodeEntry::new(request.episode, id)));
        }

        let lookup = self.series_lookup(request, adapter, retry).await?;
        let entry = match request.media_kind {
            MediaKind::Movie => lookup.episodes.first(),
            MediaKind::Series => lookup.find(request.episode),
        }
        .ok_or_else(|| {
            Error::not_found(
                kind,
                format!(
                    "episode {} not in list of {} for '{}'",
                    request.episode,
                    lookup.episodes.len(),
                    lookup.title
                ),
            )
        })?;

        Ok(ProviderIdentity::new(kind, &lookup.series_id, &entry.native_id)
            .with_media(request.media_kind, request.season)
            .with_episode(entry))
    }

    async fn series_lookup(
        &self,
        request: &MediaRequest,
        adapter: &dyn ProviderAdapter,
        retry: &RetryPolicy,
    ) -> Result<Arc<SeriesLookup>> {
        let kind = adapter.kind();
        let cache_key = (request.title_key(), kind);
        if let Some(hit) = self.cache.read().await.entries.get(&cache_key) {
            return Ok(hit.clone());
        }

        let (series_id, title) = match request.deep_link(kind) {
            Some(link) => (link.series_id.clone(), request.title.clone()),
            None => {
                let label = format!("{} search", kind);
                let hits = retry.run(&label, || adapter.search(&request.title)).await?;
                let first = hits.into_iter().next().ok_or_else(|| {
                    Error::not_found(kind, format!("no search results for '{}'", request.title))
                })?;
                (first.id, first.title)
            }
        };

        let label = format!("{} episodes", kind);
        let episodes = retry.run(&label, || adapter.get_episodes(&series_id)).await?;
        let marker = has_season_marker(&title) || has_season_marker(&request.title);
        let lookup = Arc::new(SeriesLookup {
            series_id,
            title,
            episodes: remap_season_numbering(episodes, marker),
        });

        let mut cache = self.cache.write().await;
        if cache.title_key.as_deref().is_none_or(|key| key == cache_key.0) {
            cache.entries.insert(cache_key, lookup.clone());
        }
        Ok(lookup)
    }
}
