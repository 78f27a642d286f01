//! Candidate source definitions
//!
//! A candidate source is one concrete playable URL plus metadata, before any proxy rewriting.
//! Sources are never mutated once produced; quality switches pick a different source.

use serde::{Deserialize, Serialize};

use super::identity::ProviderKind;

/// Delivery container of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Container {
    /// Chunked-segment playlist consumed progressively
    AdaptiveManifest,
    /// Single progressive file
    Direct,
}

/// Side-track type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Subtitle,
    Thumbnail,
}

/// Subtitle or thumbnail track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub url: String,
    pub kind: TrackKind,
    pub language: Option<String>,
}

impl Track {
    pub fn subtitle(url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TrackKind::Subtitle,
            language: Some(language.into()),
        }
    }

    pub fn thumbnail(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TrackKind::Thumbnail,
            language: None,
        }
    }
}

/// One playable source as returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSource {
    pub url: String,
    pub container: Container,
    /// Normalised label: "1080", "720", "360", "auto", ...
    pub quality_label: String,
    pub requires_referer: bool,
    pub referer_value: Option<String>,
    pub origin_provider: ProviderKind,
    #[serde(default)]
    pub track_list: Vec<Track>,
    /// Same-origin landing document for session-gated embeds
    #[serde(default)]
    pub landing_page: Option<String>,
}

impl CandidateSource {
    /// Create a source with no referer requirement and no tracks
    pub fn new(
        url: impl Into<String>,
        container: Container,
        quality_label: impl AsRef<str>,
        origin_provider: ProviderKind,
    ) -> Self {
        Self {
            url: url.into(),
            container,
            quality_label: normalize_quality_label(quality_label.as_ref()),
            requires_referer: false,
            referer_value: None,
            origin_provider,
            track_list: Vec::new(),
            landing_page: None,
        }
    }

    /// Create an adaptive-manifest source
    pub fn adaptive(
        url: impl Into<String>,
        quality_label: impl AsRef<str>,
        origin_provider: ProviderKind,
    ) -> Self {
        Self::new(url, Container::AdaptiveManifest, quality_label, origin_provider)
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.requires_referer = referer.as_ref().is_some_and(|r| !r.is_empty());
        self.referer_value = referer.filter(|r| !r.is_empty());
        self
    }

    pub fn with_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.track_list = tracks;
        self
    }

    pub fn with_landing_page(mut self, landing_page: impl Into<String>) -> Self {
        self.landing_page = Some(landing_page.into());
        self
    }

    pub fn is_adaptive(&self) -> bool {
        self.container == Container::AdaptiveManifest
    }

    /// Rank used for selection: lower is preferred (1080, 720, 360, other, auto).
    pub fn quality_rank(&self) -> u8 {
        match self.quality_label.as_str() {
            "1080" => 0,
            "720" => 1,
            "360" => 2,
            "auto" => 4,
            _ => 3,
        }
    }
}

/// Normalise provider quality strings such as `1080p`, `HD-720`, `default`.
pub fn normalize_quality_label(raw: &str) -> String {
    let trimmed = raw.trim().to_ascii_lowercase();
    if trimmed.is_empty() || matches!(trimmed.as_str(), "auto" | "default" | "backup") {
        return "auto".to_string();
    }
    let groups = digit_groups(&trimmed);
    // `1080p60` names the height before `p`; `1920x1080` names it after `x`
    let height = groups
        .iter()
        .find(|(_, end)| trimmed[*end..].starts_with('p'))
        .or_else(|| groups.iter().find(|(start, _)| trimmed[..*start].ends_with('x')))
        .or_else(|| groups.first());
    match height {
        Some(&(start, end)) => trimmed[start..end].to_string(),
        None => trimmed,
    }
}

/// Byte ranges of each run of ASCII digits
fn digit_groups(text: &str) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut start = None;
    for (idx, c) in text.char_indices() {
        match (c.is_ascii_digit(), start) {
            (true, None) => start = Some(idx),
            (false, Some(begin)) => {
                groups.push((begin, idx));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        groups.push((begin, text.len()));
    }
    groups
}

/// One server's answer to a source fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSources {
    pub server: String,
    pub sources: Vec<CandidateSource>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl ServerSources {
    pub fn new(server: impl Into<String>, sources: Vec<CandidateSource>) -> Self {
        Self {
            server: server.into(),
            sources,
            tracks: Vec::new(),
        }
    }

    pub fn has_adaptive(&self) -> bool {
        self.sources.iter().any(CandidateSource::is_adaptive)
    }
}
