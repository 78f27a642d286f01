//! Request type definitions
//!
//! Defines the canonical media request that drives one playback attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::identity::ProviderKind;

/// Movie or episodic content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[default]
    Series,
}

/// Audio/subtitle variant of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sub,
    Dub,
    Raw,
}

impl Category {
    /// Fixed fallback priority
    pub const PRIORITY: [Category; 3] = [Category::Sub, Category::Dub, Category::Raw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::Dub => "dub",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sub" | "subbed" => Ok(Self::Sub),
            "dub" | "dubbed" => Ok(Self::Dub),
            "raw" => Ok(Self::Raw),
            other => Err(crate::Error::invalid_request(format!(
                "Unknown category: {}",
                other
            ))),
        }
    }
}

/// Provider-native identifiers carried by a deep link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLink {
    pub provider: ProviderKind,
    pub series_id: String,
    /// Episode id; when absent the episode list is still fetched for this series
    pub episode_id: Option<String>,
}

/// Canonical request for one playback attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRequest {
    /// External catalog id, if known
    #[serde(default)]
    pub canonical_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub media_kind: MediaKind,
    #[serde(default = "default_number")]
    pub season: u32,
    #[serde(default = "default_number")]
    pub episode: u32,
    /// Provider to try first
    #[serde(default)]
    pub provider_hint: Option<ProviderKind>,
    #[serde(default)]
    pub deep_links: Vec<DeepLink>,
}

fn default_number() -> u32 {
    1
}

impl MediaRequest {
    /// Create a request for an episodic title
    pub fn series(title: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            canonical_id: None,
            title: title.into(),
            media_kind: MediaKind::Series,
            season,
            episode,
            provider_hint: None,
            deep_links: Vec::new(),
        }
    }

    /// Create a request for a movie
    pub fn movie(title: impl Into<String>) -> Self {
        Self {
            media_kind: MediaKind::Movie,
            ..Self::series(title, 1, 1)
        }
    }

    /// Set the external catalog id
    pub fn with_canonical_id(mut self, id: impl Into<String>) -> Self {
        self.canonical_id = Some(id.into());
        self
    }

    /// Set the provider hint
    pub fn with_provider_hint(mut self, provider: ProviderKind) -> Self {
        self.provider_hint = Some(provider);
        self
    }

    /// Attach provider-native identifiers from a deep link
    pub fn with_deep_link(
        mut self,
        provider: ProviderKind,
        series_id: impl Into<String>,
        episode_id: Option<String>,
    ) -> Self {
        self.deep_links.retain(|link| link.provider != provider);
        self.deep_links.push(DeepLink {
            provider,
            series_id: series_id.into(),
            episode_id,
        });
        self
    }

    pub fn deep_link(&self, provider: ProviderKind) -> Option<&DeepLink> {
        self.deep_links.iter().find(|link| link.provider == provider)
    }

    /// Key identifying the selected title (not the episode)
    pub fn title_key(&self) -> String {
        match &self.canonical_id {
            Some(id) => format!("id:{}", id),
            None => format!("title:{}", normalize_title(&self.title)),
        }
    }

    /// Key under which resume offsets are stored
    pub fn resume_key(&self) -> String {
        match self.media_kind {
            MediaKind::Movie => self.title_key(),
            MediaKind::Series => {
                format!("{}:s{}e{}", self.title_key(), self.season, self.episode)
            }
        }
    }

    /// Reject requests that cannot be resolved by any provider
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() && self.canonical_id.is_none() {
            return Err(crate::Error::invalid_request(
                "either a title or a canonical id is required",
            ));
        }
        if self.media_kind == MediaKind::Series && (self.episode == 0 || self.season == 0) {
            return Err(crate::Error::invalid_request(
                "season and episode numbers start at 1",
            ));
        }
        Ok(())
    }
}

fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_request_defaults() {
        let request = MediaRequest::series("Frieren", 1, 3);
        assert_eq!(request.media_kind, MediaKind::Series);
        assert_eq!(request.episode, 3);
        assert!(request.provider_hint.is_none());
        assert!(request.deep_links.is_empty());
    }

    #[test]
    fn test_request_deserialization_defaults() {
        let json = r#"{"title":"Some Movie","media_kind":"movie"}"#;
        let request: MediaRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.media_kind, MediaKind::Movie);
        assert_eq!(request.season, 1);
        assert_eq!(request.episode, 1);
    }

    #[test]
    fn test_title_key_prefers_canonical_id() {
        let by_title = MediaRequest::series("  Spy  X Family ", 1, 1);
        assert_eq!(by_title.title_key(), "title:spy x family");

        let by_id = by_title.clone().with_canonical_id("tv-120089");
        assert_eq!(by_id.title_key(), "id:tv-120089");
    }

    #[test]
    fn test_resume_key_includes_episode() {
        let request = MediaRequest::series("Show", 2, 5);
        assert_eq!(request.resume_key(), "title:show:s2e5");

        let movie = MediaRequest::movie("Film").with_canonical_id("movie-1");
        assert_eq!(movie.resume_key(), "id:movie-1");
    }

    #[test]
    fn test_deep_link_replaces_existing() {
        let request = MediaRequest::series("Show", 1, 1)
            .with_deep_link(ProviderKind::WatchId, "old", None)
            .with_deep_link(ProviderKind::WatchId, "new", Some("ep".to_string()));

        assert_eq!(request.deep_links.len(), 1);
        let link = request.deep_link(ProviderKind::WatchId).unwrap();
        assert_eq!(link.series_id, "new");
        assert_eq!(link.episode_id.as_deref(), Some("ep"));
    }

    #[test]
    fn test_validate() {
        assert!(MediaRequest::series("Show", 1, 1).validate().is_ok());
        assert!(MediaRequest::series("   ", 1, 1).validate().is_err());
        assert!(MediaRequest::series("Show", 1, 0).validate().is_err());
        assert!(
            MediaRequest::series("", 1, 1)
                .with_canonical_id("42")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("DUB".parse::<Category>().unwrap(), Category::Dub);
        assert_eq!("subbed".parse::<Category>().unwrap(), Category::Sub);
        assert!("karaoke".parse::<Category>().is_err());
    }
}
