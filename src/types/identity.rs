//! Provider identity types
//!
//! Identifiers a provider uses natively, and the episode listings they are derived from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::request::MediaKind;

/// Closed set of upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Embed extraction keyed by external catalog id
    TmdbEmbed,
    /// Provider-A: series session + per-episode session ids
    EpisodeSession,
    /// Provider-B: watch ids with per-category server lists
    WatchId,
    /// Provider-C: title search with slug-style episode ids
    TitleSearch,
}

impl ProviderKind {
    /// All providers in default priority order
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::TmdbEmbed,
        ProviderKind::WatchId,
        ProviderKind::EpisodeSession,
        ProviderKind::TitleSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TmdbEmbed => "tmdb_embed",
            Self::EpisodeSession => "episode_session",
            Self::WatchId => "watch_id",
            Self::TitleSearch => "title_search",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "tmdb_embed" | "tmdb" => Ok(Self::TmdbEmbed),
            "episode_session" => Ok(Self::EpisodeSession),
            "watch_id" => Ok(Self::WatchId),
            "title_search" => Ok(Self::TitleSearch),
            other => Err(crate::Error::config(format!("Unknown provider: {}", other))),
        }
    }
}

/// How a provider turns a canonical request into native identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityScheme {
    /// Title search followed by an episode list fetch
    Search,
    /// The external catalog id is the native id
    CanonicalId,
}

/// One entry of a provider search response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One episode of a provider's episode list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeEntry {
    /// Episode number as presented to the user
    pub number: u32,
    /// Provider-native episode id
    pub native_id: String,
    pub title: Option<String>,
    /// Provider numbering before a season remap, if one was applied
    pub original_number: Option<u32>,
}

impl EpisodeEntry {
    pub fn new(number: u32, native_id: impl Into<String>) -> Self {
        Self {
            number,
            native_id: native_id.into(),
            title: None,
            original_number: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Number to send back to the provider
    pub fn provider_number(&self) -> u32 {
        self.original_number.unwrap_or(self.number)
    }
}

/// Native identifiers of one (request, provider) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub provider: ProviderKind,
    pub native_series_id: String,
    pub native_episode_id: String,
    pub media_kind: MediaKind,
    pub season: u32,
    /// Requested episode number
    pub number: u32,
    /// Episode number in the provider's own numbering
    pub provider_number: u32,
    /// Diagnostic note, e.g. `renumbered from 13`
    pub note: Option<String>,
}

impl ProviderIdentity {
    pub fn new(
        provider: ProviderKind,
        native_series_id: impl Into<String>,
        native_episode_id: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            native_series_id: native_series_id.into(),
            native_episode_id: native_episode_id.into(),
            media_kind: MediaKind::Series,
            season: 1,
            number: 1,
            provider_number: 1,
            note: None,
        }
    }

    pub fn with_episode(mut self, entry: &EpisodeEntry) -> Self {
        self.number = entry.number;
        self.provider_number = entry.provider_number();
        if let Some(original) = entry.original_number {
            self.note = Some(format!("renumbered from {}", original));
        }
        self
    }

    pub fn with_media(mut self, media_kind: MediaKind, season: u32) -> Self {
        self.media_kind = media_kind;
        self.season = season;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_renumbered(&self) -> bool {
        self.number != self.provider_number
    }
}
