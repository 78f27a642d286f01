//! Embed extraction keyed by external catalog id
//!
//! There is no search step: the canonical id is the native id. The sources carry the embed
//! landing page, which some CDNs require to be loaded before they accept fragment requests.

use serde::Deserialize;

use super::{ProviderAdapter, ProviderHttp, looks_adaptive};
use crate::{
    Error, Result,
    types::{
        CandidateSource, Category, Container, EpisodeEntry, IdentityScheme, MediaKind,
        ProviderIdentity, ProviderKind, SearchHit, ServerSources, Track,
        serde_helpers::deserialize_flexible_bool,
    },
};

const SERVER: &str = "embed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbedResponse {
    #[serde(default)]
    sources: Vec<EmbedSource>,
    #[serde(default)]
    subtitles: Vec<EmbedSubtitle>,
    #[serde(default)]
    referer: Option<String>,
    #[serde(default)]
    embed_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedSource {
    url: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default, rename = "isM3U8", deserialize_with = "deserialize_flexible_bool")]
    is_m3u8: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct EmbedSubtitle {
    url: String,
    #[serde(default, alias = "label")]
    lang: Option<String>,
}

#[derive(Debug)]
pub struct TmdbEmbedAdapter {
    http: ProviderHttp,
}

impl TmdbEmbedAdapter {
    pub fn new(http: ProviderHttp) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for TmdbEmbedAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TmdbEmbed
    }

    fn categories(&self) -> &[Category] {
        &[Category::Sub]
    }

    fn identity_scheme(&self) -> IdentityScheme {
        IdentityScheme::CanonicalId
    }

    async fn search(&self, _title: &str) -> Result<Vec<SearchHit>> {
        Err(Error::not_found(self.kind(), "requires a catalog id"))
    }

    async fn get_episodes(&self, _series_id: &str) -> Result<Vec<EpisodeEntry>> {
        Err(Error::not_found(self.kind(), "requires a catalog id"))
    }

    async fn list_servers(
        &self,
        _episode: &ProviderIdentity,
        _category: Category,
    ) -> Result<Vec<String>> {
        Ok(vec![SERVER.to_string()])
    }

    async fn get_sources(
        &self,
        episode: &ProviderIdentity,
        _category: Category,
        server: &str,
    ) -> Result<ServerSources> {
        let season = episode.season.to_string();
        let number = episode.provider_number.to_string();
        let id = episode.native_series_id.as_str();
        let segments: Vec<&str> = match episode.media_kind {
            MediaKind::Movie => vec!["movie", id],
            MediaKind::Series => vec!["tv", id, season.as_str(), number.as_str()],
        };

        let response: EmbedResponse = self.http.get_json(&segments, &[]).await?;

        let tracks: Vec<Track> = response
            .subtitles
            .into_iter()
            .map(|s| Track::subtitle(s.url, s.lang.unwrap_or_else(|| "unknown".to_string())))
            .collect();

        let sources = response
            .sources
            .into_iter()
            .map(|s| {
                let container = if looks_adaptive(&s.url, s.is_m3u8) {
                    Container::AdaptiveManifest
                } else {
                    Container::Direct
                };
                let mut source = CandidateSource::new(
                    s.url,
                    container,
                    s.quality.as_deref().unwrap_or("auto"),
                    self.kind(),
                )
                .with_referer(response.referer.clone())
                .with_tracks(tracks.clone());
                if let Some(landing) = &response.embed_url {
                    source = source.with_landing_page(landing.clone());
                }
                source
            })
            .collect();

        let mut set = ServerSources::new(server, sources);
        set.tracks = tracks;
        Ok(set)
    }
}
