//! # Provider Adapters
//!
//! Each upstream provider has its own identifier scheme, episode semantics and source shape.
//! They are modelled as a closed set of [`ProviderKind`] variants behind the single
//! [`ProviderAdapter`] interface, so the orchestrator never branches on provider specifics.
//!
//! | Provider | Identity | Categories | Servers |
//! |----------|----------|------------|---------|
//! | `tmdb_embed` | canonical catalog id | sub | `embed` |
//! | `episode_session` | search + release list | sub, dub | `kwik` |
//! | `watch_id` | search + episode list | sub, dub, raw | listed per category |
//! | `title_search` | search + info | sub | configured |
//!
//! All adapters share [`ProviderHttp`] for timeouts and failure classification.

pub mod episode_session;
pub mod http;
#[cfg(test)]
pub(crate) mod testing;
pub mod title_search;
pub mod tmdb_embed;
pub mod watch_id;

pub use episode_session::EpisodeSessionAdapter;
pub use http::ProviderHttp;
pub use title_search::TitleSearchAdapter;
pub use tmdb_embed::TmdbEmbedAdapter;
pub use watch_id::WatchIdAdapter;

use std::sync::Arc;

use crate::{
    Result,
    config::Settings,
    types::{
        Category, EpisodeEntry, IdentityScheme, ProviderIdentity, ProviderKind, SearchHit,
        ServerSources,
    },
};

/// Uniform interface over one upstream provider
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// Categories this provider can serve, in no particular order
    fn categories(&self) -> &[Category];

    fn identity_scheme(&self) -> IdentityScheme {
        IdentityScheme::Search
    }

    /// Title search; hits are returned in provider order
    async fn search(&self, title: &str) -> Result<Vec<SearchHit>>;

    /// Episode list of one series, ascending by episode number
    async fn get_episodes(&self, series_id: &str) -> Result<Vec<EpisodeEntry>>;

    /// Server backends for one episode and category, in provider order
    async fn list_servers(
        &self,
        episode: &ProviderIdentity,
        category: Category,
    ) -> Result<Vec<String>>;

    async fn get_sources(
        &self,
        episode: &ProviderIdentity,
        category: Category,
        server: &str,
    ) -> Result<ServerSources>;
}

/// Construct one adapter per provider, in configured priority order
pub fn build_adapters(settings: &Settings) -> Result<Vec<Arc<dyn ProviderAdapter>>> {
    settings
        .providers
        .priority
        .iter()
        .map(|kind| build_adapter(*kind, settings))
        .collect()
}

fn build_adapter(kind: ProviderKind, settings: &Settings) -> Result<Arc<dyn ProviderAdapter>> {
    let http = ProviderHttp::new(kind, settings)?;
    let adapter: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::TmdbEmbed => Arc::new(TmdbEmbedAdapter::new(http)),
        ProviderKind::EpisodeSession => Arc::new(EpisodeSessionAdapter::new(http)),
        ProviderKind::WatchId => Arc::new(WatchIdAdapter::new(http)),
        ProviderKind::TitleSearch => Arc::new(TitleSearchAdapter::new(
            http,
            settings.providers.title_search.servers.clone(),
        )),
    };
    Ok(adapter)
}

/// Treat `.m3u8` URLs as adaptive even when the payload flag is missing
pub(crate) fn looks_adaptive(url: &str, flag: Option<bool>) -> bool {
    flag.unwrap_or(false) || url.split('?').next().is_some_and(|path| path.ends_with(".m3u8"))
}
