//! Scripted in-memory adapter for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::ProviderAdapter;
use crate::{
    Error, Result,
    types::{
        CandidateSource, Category, EpisodeEntry, IdentityScheme, ProviderIdentity, ProviderKind,
        SearchHit, ServerSources,
    },
};

/// One scripted reply to `get_sources`
#[derive(Debug, Clone)]
pub enum Reply {
    Sources(ServerSources),
    Delayed(Duration, ServerSources),
    Transient,
    Status(u16),
}

#[derive(Debug)]
pub struct ScriptedAdapter {
    kind: ProviderKind,
    categories: Vec<Category>,
    scheme: IdentityScheme,
    hits: Vec<SearchHit>,
    /// Hits for one search query, overriding `hits`
    titled_hits: HashMap<String, Vec<SearchHit>>,
    search_delay: Option<Duration>,
    episodes: Vec<EpisodeEntry>,
    servers: HashMap<Category, Vec<String>>,
    replies: Mutex<HashMap<(Category, String), VecDeque<Reply>>>,
    pub search_calls: AtomicUsize,
    pub source_calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            categories: vec![Category::Sub],
            scheme: IdentityScheme::Search,
            hits: Vec::new(),
            titled_hits: HashMap::new(),
            search_delay: None,
            episodes: Vec::new(),
            servers: HashMap::new(),
            replies: Mutex::new(HashMap::new()),
            search_calls: AtomicUsize::new(0),
            source_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_categories(mut self, categories: &[Category]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    pub fn with_scheme(mut self, scheme: IdentityScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_hit(mut self, id: &str, title: &str) -> Self {
        self.hits.push(SearchHit::new(id, title));
        self
    }

    pub fn with_hit_for(mut self, query: &str, id: &str, title: &str) -> Self {
        self.titled_hits
            .entry(query.to_string())
            .or_default()
            .push(SearchHit::new(id, title));
        self
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    /// `count` episodes numbered from `first`, native ids `ep-{n}`
    pub fn with_episodes(mut self, first: u32, count: u32) -> Self {
        self.episodes = (first..first + count)
            .map(|n| EpisodeEntry::new(n, format!("ep-{}", n)))
            .collect();
        self
    }

    pub fn with_server(mut self, category: Category, server: &str, replies: Vec<Reply>) -> Self {
        self.servers
            .entry(category)
            .or_default()
            .push(server.to_string());
        self.replies
            .get_mut()
            .unwrap()
            .insert((category, server.to_string()), replies.into());
        self
    }

    /// Single-server provider that always answers with the given labels
    pub fn serving(kind: ProviderKind, labels: &[&str]) -> Self {
        let set = adaptive_set(kind, "s1", labels);
        Self::new(kind)
            .with_hit("series-1", "Series")
            .with_episodes(1, 12)
            .with_server(Category::Sub, "s1", vec![Reply::Sources(set)])
    }

    pub fn source_calls(&self) -> usize {
        self.source_calls.load(Ordering::SeqCst)
    }
}

/// Adaptive sources for each quality label, urls `https://{kind}.test/{server}/{label}.m3u8`
pub fn adaptive_set(kind: ProviderKind, server: &str, labels: &[&str]) -> ServerSources {
    let sources = labels
        .iter()
        .map(|label| {
            CandidateSource::adaptive(
                format!("https://{}.test/{}/{}.m3u8", kind, server, label),
                label,
                kind,
            )
        })
        .collect();
    ServerSources::new(server, sources)
}

#[async_trait::async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn categories(&self) -> &[Category] {
        &self.categories
    }

    fn identity_scheme(&self) -> IdentityScheme {
        self.scheme
    }

    async fn search(&self, title: &str) -> Result<Vec<SearchHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .titled_hits
            .get(title)
            .cloned()
            .unwrap_or_else(|| self.hits.clone()))
    }

    async fn get_episodes(&self, _series_id: &str) -> Result<Vec<EpisodeEntry>> {
        Ok(self.episodes.clone())
    }

    async fn list_servers(
        &self,
        _episode: &ProviderIdentity,
        category: Category,
    ) -> Result<Vec<String>> {
        Ok(self.servers.get(&category).cloned().unwrap_or_default())
    }

    async fn get_sources(
        &self,
        _episode: &ProviderIdentity,
        category: Category,
        server: &str,
    ) -> Result<ServerSources> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let queue = replies
                .get_mut(&(category, server.to_string()))
                .ok_or_else(|| Error::not_found(self.kind, "unknown server"))?;
            // the last reply repeats
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match reply {
            Some(Reply::Sources(set)) => Ok(set),
            Some(Reply::Delayed(delay, set)) => {
                tokio::time::sleep(delay).await;
                Ok(set)
            }
            Some(Reply::Transient) => Err(Error::transient(self.kind, "HTTP 503")),
            Some(Reply::Status(status)) => Err(Error::upstream(self.kind, status, "scripted")),
            None => Err(Error::not_found(self.kind, "no scripted reply")),
        }
    }
}
