//! Provider with a series session and per-episode session ids
//!
//! The release listing returns every episode in one page. Sources come from a single
//! server and are requested per audio category.

use serde::Deserialize;

use super::{ProviderAdapter, ProviderHttp, looks_adaptive};
use crate::{
    Result,
    types::{
        CandidateSource, Category, Container, EpisodeEntry, ProviderIdentity, ProviderKind,
        SearchHit, ServerSources,
        serde_helpers::{
            deserialize_flexible_bool, deserialize_flexible_string, deserialize_flexible_u32,
        },
    },
};

const SERVER: &str = "kwik";

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SeriesHit {
    #[serde(deserialize_with = "deserialize_flexible_string")]
    session: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(deserialize_with = "deserialize_flexible_u32")]
    episode: u32,
    session: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayResponse {
    #[serde(default)]
    sources: Vec<PlaySource>,
    #[serde(default)]
    referer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaySource {
    url: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default, rename = "isM3U8", deserialize_with = "deserialize_flexible_bool")]
    is_m3u8: Option<bool>,
}

#[derive(Debug)]
pub struct EpisodeSessionAdapter {
    http: ProviderHttp,
}

impl EpisodeSessionAdapter {
    pub fn new(http: ProviderHttp) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for EpisodeSessionAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::EpisodeSession
    }

    fn categories(&self) -> &[Category] {
        &[Category::Sub, Category::Dub]
    }

    async fn search(&self, title: &str) -> Result<Vec<SearchHit>> {
        let envelope: DataEnvelope<SeriesHit> =
            self.http.get_json(&["search"], &[("q", title)]).await?;
        Ok(envelope
            .data
            .into_iter()
            .map(|hit| SearchHit::new(hit.session, hit.title))
            .collect())
    }

    async fn get_episodes(&self, series_id: &str) -> Result<Vec<EpisodeEntry>> {
        let envelope: DataEnvelope<Release> = self
            .http
            .get_json(&["release"], &[("id", series_id), ("page", "all")])
            .await?;

        let mut episodes: Vec<EpisodeEntry> = envelope
            .data
            .into_iter()
            .map(|release| {
                let entry = EpisodeEntry::new(release.episode, release.session);
                match release.title {
                    Some(title) => entry.with_title(title),
                    None => entry,
                }
            })
            .collect();
        episodes.sort_by_key(|e| e.number);
        Ok(episodes)
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
        category: Category,
        server: &str,
    ) -> Result<ServerSources> {
        let response: PlayResponse = self
            .http
            .get_json(
                &["play"],
                &[
                    ("id", episode.native_series_id.as_str()),
                    ("episode", episode.native_episode_id.as_str()),
                    ("category", category.as_str()),
                ],
            )
            .await?;

        let sources = response
            .sources
            .into_iter()
            .map(|s| {
                let container = if looks_adaptive(&s.url, s.is_m3u8) {
                    Container::AdaptiveManifest
                } else {
                    Container::Direct
                };
                CandidateSource::new(
                    s.url,
                    container,
                    s.quality.as_deref().unwrap_or("auto"),
                    self.kind(),
                )
                .with_referer(response.referer.clone())
            })
            .collect();

        Ok(ServerSources::new(server, sources))
    }
}
