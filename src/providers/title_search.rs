//! Provider with path-based title search and slug episode ids
//!
//! The provider does not list its servers, so the configured list is tried in order.

use serde::Deserialize;
use std::collections::HashMap;

use super::{ProviderAdapter, ProviderHttp, looks_adaptive};
use crate::{
    Result,
    types::{
        CandidateSource, Category, Container, EpisodeEntry, ProviderIdentity, ProviderKind,
        SearchHit, ServerSources, Track,
        serde_helpers::{deserialize_flexible_bool, deserialize_flexible_u32},
    },
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    episodes: Vec<InfoEpisode>,
}

#[derive(Debug, Deserialize)]
struct InfoEpisode {
    id: String,
    #[serde(deserialize_with = "deserialize_flexible_u32")]
    number: u32,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchResponse {
    #[serde(default)]
    sources: Vec<WatchSource>,
    #[serde(default)]
    subtitles: Vec<WatchSubtitle>,
    #[serde(default)]
    headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchSource {
    url: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default, rename = "isM3U8", deserialize_with = "deserialize_flexible_bool")]
    is_m3u8: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct WatchSubtitle {
    url: String,
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Debug)]
pub struct TitleSearchAdapter {
    http: ProviderHttp,
    servers: Vec<String>,
}

impl TitleSearchAdapter {
    pub fn new(http: ProviderHttp, servers: Vec<String>) -> Self {
        Self { http, servers }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for TitleSearchAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TitleSearch
    }

    fn categories(&self) -> &[Category] {
        &[Category::Sub]
    }

    async fn search(&self, title: &str) -> Result<Vec<SearchHit>> {
        let response: SearchResponse = self.http.get_json(&["search", title], &[]).await?;
        Ok(response
            .results
            .into_iter()
            .map(|entry| SearchHit::new(entry.id, entry.title))
            .collect())
    }

    async fn get_episodes(&self, series_id: &str) -> Result<Vec<EpisodeEntry>> {
        let response: InfoResponse = self.http.get_json(&["info", series_id], &[]).await?;

        let mut episodes: Vec<EpisodeEntry> = response
            .episodes
            .into_iter()
            .map(|item| {
                let entry = EpisodeEntry::new(item.number, item.id);
                match item.title {
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
        Ok(self.servers.clone())
    }

    async fn get_sources(
        &self,
        episode: &ProviderIdentity,
        _category: Category,
        server: &str,
    ) -> Result<ServerSources> {
        let response: WatchResponse = self
            .http
            .get_json(&["watch", episode.native_episode_id.as_str()], &[("server", server)])
            .await?;

        let referer = response
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("referer"))
            .map(|(_, value)| value.clone());

        let tracks: Vec<Track> = response
            .subtitles
            .into_iter()
            .map(|s| {
                // thumbnails arrive as a pseudo-subtitle
                let thumbnails = s
                    .lang
                    .as_deref()
                    .is_some_and(|lang| lang.eq_ignore_ascii_case("thumbnails"));
                if thumbnails {
                    Track::thumbnail(s.url)
                } else {
                    Track::subtitle(s.url, s.lang.unwrap_or_else(|| "unknown".to_string()))
                }
            })
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
                CandidateSource::new(
                    s.url,
                    container,
                    s.quality.as_deref().unwrap_or("auto"),
                    self.kind(),
                )
                .with_referer(referer.clone())
                .with_tracks(tracks.clone())
            })
            .collect();

        let mut set = ServerSources::new(server, sources);
        set.tracks = tracks;
        Ok(set)
    }
}
