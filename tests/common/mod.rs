//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

/// Test helper functions
#[allow(dead_code)]
pub mod helpers {
    use playback_resolver::{config::Settings, types::ProviderKind};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const LOCAL_PROXY_BASE: &str = "http://resolver.test/proxy";
    pub const EMBED_REFERER: &str = "https://megacloud.test/";

    /// Settings that only consult the watch-id provider at `base_url`
    pub fn watch_only_settings(base_url: &str) -> Settings {
        let mut settings = Settings::default();
        settings.providers.priority = vec![ProviderKind::WatchId];
        settings.providers.request_timeout_secs = 2;
        settings.providers.watch_id.base_url = base_url.to_string();
        settings.proxy.local_base = LOCAL_PROXY_BASE.to_string();
        settings.retry.delay_ms = 10;
        settings
    }

    /// Search and episode listing for one series with `episodes` episodes
    pub async fn mount_catalog(server: &MockServer, title: &str, episodes: u32) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "animes": [{"id": "series-100", "name": title}]
            })))
            .mount(server)
            .await;

        let listing: Vec<_> = (1..=episodes)
            .map(|n| json!({"number": n, "episodeId": format!("series-100?ep={}", n)}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/episodes/series-100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "episodes": listing })))
            .mount(server)
            .await;
    }

    /// Sub category with one server
    pub async fn mount_sub_server(server: &MockServer, name: &str) {
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": [{"serverName": name}]
            })))
            .mount(server)
            .await;
    }

    /// Adaptive source on `name` whose manifest lives at `manifest_url`
    pub async fn mount_adaptive_source(server: &MockServer, name: &str, manifest_url: &str) {
        Mock::given(method("GET"))
            .and(path("/sources"))
            .and(query_param("server", name))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sources": [{"url": manifest_url, "type": "hls"}],
                "tracks": [{"file": "https://cdn.test/en.vtt", "label": "English", "kind": "captions"}],
                "headers": {"Referer": EMBED_REFERER}
            })))
            .mount(server)
            .await;
    }

    /// Source listing that never yields anything playable
    pub async fn mount_empty_sources(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/sources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sources": [] })))
            .mount(server)
            .await;
    }
}
