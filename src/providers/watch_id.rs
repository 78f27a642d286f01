//! Provider keyed by watch ids with per-category server lists
//!
//! The richest of the adapters: servers are listed per episode and category, sources come
//! with subtitle and thumbnail tracks, and the required referer is returned as a header map.

use serde::Deserialize;
use std::collections::HashMap;

use super::{ProviderAdapter, ProviderHttp, looks_adaptive};
use crate::{
    Result,
    types::{
        CandidateSource, Category, Container, EpisodeEntry, ProviderIdentity, ProviderKind,
        SearchHit, ServerSources, Track,
        serde_helpers::{deserialize_flexible_string, deserialize_flexible_u32},
    },
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    animes: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    #[serde(deserialize_with = "deserialize_flexible_string")]
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct EpisodesResponse {
    #[serde(default)]
    episodes: Vec<EpisodeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeItem {
    #[serde(deserialize_with = "deserialize_flexible_u32")]
    number: u32,
    episode_id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServersResponse {
    #[serde(default)]
    sub: Vec<ServerItem>,
    #[serde(default)]
    dub: Vec<ServerItem>,
    #[serde(default)]
    raw: Vec<ServerItem>,
}

impl ServersResponse {
    fn for_category(self, category: Category) -> Vec<ServerItem> {
        match category {
            Category::Sub => self.sub,
            Category::Dub => self.dub,
            Category::Raw => self.raw,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerItem {
    server_name: String,
}

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: Vec<SourceItem>,
    #[serde(default)]
    tracks: Vec<TrackItem>,
    #[serde(default)]
    headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SourceItem {
    url: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    file: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

impl TrackItem {
    fn into_track(self) -> Track {
        match self.kind.as_deref() {
            Some("thumbnails") => Track::thumbnail(self.file),
            _ => Track::subtitle(self.file, self.label.unwrap_or_else(|| "unknown".to_string())),
        }
    }
}

fn referer_from(headers: &HashMap<String, String>) -> Option<String> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("referer"))
        .map(|(_, value)| value.clone())
}

#[derive(Debug)]
pub struct WatchIdAdapter {
    http: ProviderHttp,
}

impl WatchIdAdapter {
    pub fn new(http: ProviderHttp) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for WatchIdAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::WatchId
    }

    fn categories(&self) -> &[Category] {
        &Category::PRIORITY
    }

    async fn search(&self, title: &str) -> Result<Vec<SearchHit>> {
        let response: SearchResponse = self.http.get_json(&["search"], &[("q", title)]).await?;
        Ok(response
            .animes
            .into_iter()
            .map(|entry| SearchHit::new(entry.id, entry.name))
            .collect())
    }

    async fn get_episodes(&self, series_id: &str) -> Result<Vec<EpisodeEntry>> {
        let response: EpisodesResponse = self.http.get_json(&["episodes", series_id], &[]).await?;

        let mut episodes: Vec<EpisodeEntry> = response
            .episodes
            .into_iter()
            .map(|item| {
                let entry = EpisodeEntry::new(item.number, item.episode_id);
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
        episode: &ProviderIdentity,
        category: Category,
    ) -> Result<Vec<String>> {
        let response: ServersResponse = self
            .http
            .get_json(&["servers"], &[("episodeId", episode.native_episode_id.as_str())])
            .await?;

        Ok(response
            .for_category(category)
            .into_iter()
            .map(|item| item.server_name)
            .collect())
    }

    async fn get_sources(
        &self,
        episode: &ProviderIdentity,
        category: Category,
        server: &str,
    ) -> Result<ServerSources> {
        let response: SourcesResponse = self
            .http
            .get_json(
                &["sources"],
                &[
                    ("episodeId", episode.native_episode_id.as_str()),
                    ("server", server),
                    ("category", category.as_str()),
                ],
            )
            .await?;

        let referer = referer_from(&response.headers);
        let tracks: Vec<Track> = response
            .tracks
            .into_iter()
            .map(TrackItem::into_track)
            .collect();

        let sources = response
            .sources
            .into_iter()
            .map(|s| {
                let flagged = s.kind.as_deref().map(|k| k.eq_ignore_ascii_case("hls"));
                let container = if looks_adaptive(&s.url, flagged) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackKind;
    use reqwest::Client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, WatchIdAdapter) {
        let server = MockServer::start().await;
        let http = ProviderHttp::with_client(
            ProviderKind::WatchId,
            Client::new(),
            &server.uri(),
            &[502, 503],
        )
        .unwrap();
        (server, WatchIdAdapter::new(http))
    }

    #[tokio::test]
    async fn test_episodes_path_is_encoded() {
        let (server, adapter) = setup().await;
        Mock::given(method("GET"))
            .and(path("/episodes/frieren-18542"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "episodes": [
                    {"number": 2, "episodeId": "frieren-18542?ep=107257"},
                    {"number": 1, "episodeId": "frieren-18542?ep=107256", "title": "The Journey's End"}
                ]
            })))
            .mount(&server)
            .await;

        let episodes = adapter.get_episodes("frieren-18542").await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].native_id, "frieren-18542?ep=107256");
    }

    #[tokio::test]
    async fn test_servers_per_category() {
        let (server, adapter) = setup().await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .and(query_param("episodeId", "ep-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": [{"serverName": "hd-1"}, {"serverName": "hd-2"}],
                "dub": [{"serverName": "hd-2"}]
            })))
            .mount(&server)
            .await;

        let identity = ProviderIdentity::new(ProviderKind::WatchId, "series", "ep-1");
        assert_eq!(
            adapter.list_servers(&identity, Category::Sub).await.unwrap(),
            vec!["hd-1", "hd-2"]
        );
        assert!(
            adapter
                .list_servers(&identity, Category::Raw)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_sources_with_tracks_and_referer() {
        let (server, adapter) = setup().await;
        Mock::given(method("GET"))
            .and(path("/sources"))
            .and(query_param("episodeId", "ep-1"))
            .and(query_param("server", "hd-1"))
            .and(query_param("category", "sub"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sources": [{"url": "https://cdn.watch.test/master.txt", "type": "hls"}],
                "tracks": [
                    {"file": "https://cdn.watch.test/en.vtt", "label": "English", "kind": "captions"},
                    {"file": "https://cdn.watch.test/thumbs.vtt", "kind": "thumbnails"}
                ],
                "headers": {"Referer": "https://megacloud.test/"}
            })))
            .mount(&server)
            .await;

        let identity = ProviderIdentity::new(ProviderKind::WatchId, "series", "ep-1");
        let set = adapter
            .get_sources(&identity, Category::Sub, "hd-1")
            .await
            .unwrap();

        assert!(set.has_adaptive());
        let source = &set.sources[0];
        assert_eq!(source.referer_value.as_deref(), Some("https://megacloud.test/"));
        assert_eq!(source.quality_label, "auto");
        assert_eq!(set.tracks[0].kind, TrackKind::Subtitle);
        assert_eq!(set.tracks[0].language.as_deref(), Some("English"));
        assert_eq!(set.tracks[1].kind, TrackKind::Thumbnail);
    }

    #[tokio::test]
    async fn test_search_with_empty_result() {
        let (server, adapter) = setup().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        assert!(adapter.search("nothing").await.unwrap().is_empty());
    }
}
