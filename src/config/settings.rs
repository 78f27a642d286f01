//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the resolver.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::ProviderKind;

/// Main configuration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server configuration
    pub server: ServerSettings,
    /// Upstream provider endpoints and order
    pub providers: ProviderSettings,
    /// Retry policy for individual fetches
    pub retry: RetrySettings,
    /// Proxy/referer classification
    pub proxy: ProxySettings,
    /// Resume position persistence
    pub resume: ResumeSettings,
    /// Automatic provider failover
    pub failover: FailoverSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Base URL (and optional server list) of one provider endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub base_url: String,
    /// Servers to try, for providers that do not list them
    pub servers: Vec<String>,
}

impl EndpointSettings {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            servers: Vec::new(),
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Fixed try-order after the request hint
    pub priority: Vec<ProviderKind>,
    /// Per-call timeout in seconds
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub tmdb_embed: EndpointSettings,
    pub episode_session: EndpointSettings,
    pub watch_id: EndpointSettings,
    pub title_search: EndpointSettings,
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts after the first one
    pub max_retries: usize,
    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
    /// HTTP statuses treated as transient
    pub transient_statuses: Vec<u16>,
}

/// Proxy strategy for a matched CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CdnStrategy {
    /// Third-party edge rewriting function
    Edge,
    /// First-party proxy endpoint
    Local,
    /// Landing document must be loaded before fragments
    Bootstrap,
}

/// One row of the CDN classification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnRule {
    /// Host suffix, e.g. `cdn.example.net`
    pub pattern: String,
    pub strategy: CdnStrategy,
}

impl CdnRule {
    pub fn new(pattern: impl Into<String>, strategy: CdnStrategy) -> Self {
        Self {
            pattern: pattern.into(),
            strategy,
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// First-party proxy endpoint
    pub local_base: String,
    /// Edge rewrite function endpoint
    pub edge_base: String,
    /// Classification table, first match wins
    pub rules: Vec<CdnRule>,
}

/// Resume persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeSettings {
    /// Positions at or below this are not persisted
    pub min_progress_secs: f64,
    /// Offsets this close to the end count as finished
    pub finished_window_secs: f64,
    /// Entries older than this are ignored on read
    pub max_age_days: i64,
    pub persist_interval_secs: u64,
    /// Store file; defaults to the platform data directory
    pub store_path: Option<PathBuf>,
}

/// Failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverSettings {
    /// Automatic provider switches allowed per selection
    pub max_hops: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "::".to_string(),
            port: 4417,
            timeout_secs: 30,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            priority: ProviderKind::ALL.to_vec(),
            request_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            tmdb_embed: EndpointSettings::new("http://localhost:3000/api/embed"),
            episode_session: EndpointSettings::new("http://localhost:3000/api/episode-session"),
            watch_id: EndpointSettings::new("http://localhost:3000/api/watch"),
            title_search: EndpointSettings {
                base_url: "http://localhost:3000/api/title".to_string(),
                servers: vec!["vidstreaming".to_string(), "gogocdn".to_string()],
            },
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay_ms: 500,
            transient_statuses: vec![502, 503],
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            local_base: "http://localhost:4417/proxy".to_string(),
            edge_base: "https://edge.localhost/rewrite".to_string(),
            rules: Vec::new(),
        }
    }
}

impl Default for ResumeSettings {
    fn default() -> Self {
        Self {
            min_progress_secs: 5.0,
            finished_window_secs: 10.0,
            max_age_days: 7,
            persist_interval_secs: 5,
            store_path: None,
        }
    }
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self { max_hops: 1 }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl ProviderSettings {
    pub fn endpoint(&self, kind: ProviderKind) -> &EndpointSettings {
        match kind {
            ProviderKind::TmdbEmbed => &self.tmdb_embed,
            ProviderKind::EpisodeSession => &self.episode_session,
            ProviderKind::WatchId => &self.watch_id,
            ProviderKind::TitleSearch => &self.title_search,
        }
    }

    pub fn endpoint_mut(&mut self, kind: ProviderKind) -> &mut EndpointSettings {
        match kind {
            ProviderKind::TmdbEmbed => &mut self.tmdb_embed,
            ProviderKind::EpisodeSession => &mut self.episode_session,
            ProviderKind::WatchId => &mut self.watch_id,
            ProviderKind::TitleSearch => &mut self.title_search,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; missing sections fall back to defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Apply environment variable overrides on top of these settings
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(host) = std::env::var("RESOLVER_SERVER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("RESOLVER_SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid port: {}", e)))?;
        }

        if let Ok(priority) = std::env::var("RESOLVER_PROVIDER_PRIORITY") {
            self.providers.priority = priority
                .split(',')
                .filter(|name| !name.trim().is_empty())
                .map(str::parse)
                .collect::<crate::Result<Vec<_>>>()?;
        }

        for kind in ProviderKind::ALL {
            let var = format!("RESOLVER_{}_URL", kind.as_str().to_ascii_uppercase());
            if let Ok(url) = std::env::var(&var) {
                self.providers.endpoint_mut(kind).base_url = url;
            }
        }

        if let Ok(base) = std::env::var("RESOLVER_PROXY_LOCAL_BASE") {
            self.proxy.local_base = base;
        }

        if let Ok(base) = std::env::var("RESOLVER_PROXY_EDGE_BASE") {
            self.proxy.edge_base = base;
        }

        if let Ok(path) = std::env::var("RESOLVER_RESUME_PATH") {
            self.resume.store_path = Some(PathBuf::from(path));
        }

        Ok(self)
    }

    /// Reject settings that would make resolution impossible or unbounded
    pub fn validate(&self) -> crate::Result<()> {
        if self.providers.priority.is_empty() {
            return Err(crate::Error::config("provider priority list is empty"));
        }

        let mut seen = HashSet::new();
        for kind in &self.providers.priority {
            if !seen.insert(kind) {
                return Err(crate::Error::config(format!(
                    "provider {} listed twice in priority",
                    kind
                )));
            }
            url::Url::parse(&self.providers.endpoint(*kind).base_url).map_err(|e| {
                crate::Error::config(format!("invalid base_url for {}: {}", kind, e))
            })?;
        }

        if self.providers.request_timeout_secs == 0 {
            return Err(crate::Error::config("request timeout must be positive"));
        }

        if self.retry.max_retries > 5 {
            return Err(crate::Error::config("max_retries may not exceed 5"));
        }

        url::Url::parse(&self.proxy.local_base)
            .map_err(|e| crate::Error::config(format!("invalid proxy.local_base: {}", e)))?;
        url::Url::parse(&self.proxy.edge_base)
            .map_err(|e| crate::Error::config(format!("invalid proxy.edge_base: {}", e)))?;

        if self.resume.finished_window_secs < 0.0 || self.resume.min_progress_secs < 0.0 {
            return Err(crate::Error::config("resume thresholds must be non-negative"));
        }

        if self.resume.persist_interval_secs == 0 {
            return Err(crate::Error::config("resume persist interval must be positive"));
        }

        Ok(())
    }

    /// Resolve the resume store location
    pub fn resume_store_path(&self) -> PathBuf {
        self.resume.store_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("playback-resolver")
                .join("resume.json")
        })
    }
}
