//! Proxy/referer strategy
//!
//! Browsers cannot set `Referer` on cross-origin media requests, so sources from CDNs that
//! enforce one are routed through a rewriting proxy. The decision is table driven: the
//! configured [`CdnRule`]s are matched against the URL host by suffix, first match wins.
//! Unmatched sources fall back to the first-party proxy when they need a referer, to a
//! session bootstrap when they carry an embed landing page, and to direct playback otherwise.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::{
    Error, Result,
    config::{CdnRule, CdnStrategy, ProxySettings},
    types::{CandidateSource, Container, Track},
};

/// How the player reaches a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStrategy {
    Direct,
    /// Third-party edge function injecting the referer
    Edge,
    /// First-party `/proxy` endpoint
    Local,
}

/// A source wrapped for playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableUrl {
    pub url: String,
    pub strategy: ProxyStrategy,
    pub requires_session_bootstrap: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_bootstrap_url: Option<String>,
    /// Headers the engine must send with every fragment request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fragment_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    pub quality_label: String,
    pub container: Container,
}

/// Host-suffix classification table
#[derive(Debug, Clone, Default)]
pub struct CdnClassifier {
    rules: Vec<CdnRule>,
}

impl CdnClassifier {
    pub fn new(rules: Vec<CdnRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = rule.pattern.trim().trim_start_matches('.').to_ascii_lowercase();
                CdnRule::new(pattern, rule.strategy)
            })
            .filter(|rule| !rule.pattern.is_empty())
            .collect();
        Self { rules }
    }

    /// Strategy of the first rule whose pattern is the host or a parent domain of it
    pub fn classify(&self, url: &str) -> Option<CdnStrategy> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                host == rule.pattern
                    || host
                        .strip_suffix(rule.pattern.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
            .map(|rule| rule.strategy)
    }
}

/// `{base}?url=..&referer=..`
pub fn proxied_url(base: &Url, target: &str, referer: Option<&str>) -> String {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("url", target);
        if let Some(referer) = referer {
            query.append_pair("referer", referer);
        }
    }
    url.to_string()
}

/// Builds [`PlayableUrl`]s from candidate sources
#[derive(Debug, Clone)]
pub struct ProxyStrategyBuilder {
    classifier: CdnClassifier,
    local_base: Url,
    edge_base: Url,
}

impl ProxyStrategyBuilder {
    pub fn new(settings: &ProxySettings) -> Result<Self> {
        let parse = |name: &str, value: &str| {
            Url::parse(value).map_err(|e| Error::config(format!("invalid proxy {}: {}", name, e)))
        };
        Ok(Self {
            classifier: CdnClassifier::new(settings.rules.clone()),
            local_base: parse("local_base", &settings.local_base)?,
            edge_base: parse("edge_base", &settings.edge_base)?,
        })
    }

    pub fn local_base(&self) -> &Url {
        &self.local_base
    }

    pub fn build_playable_url(&self, source: &CandidateSource) -> PlayableUrl {
        let referer = source.referer_value.as_deref();
        let classified = self.classifier.classify(&source.url);

        let strategy = match classified {
            Some(strategy) => Some(strategy),
            None if source.landing_page.is_some() => Some(CdnStrategy::Bootstrap),
            None if source.requires_referer => Some(CdnStrategy::Local),
            None => None,
        };

        let bootstrap_url = source
            .landing_page
            .clone()
            .or_else(|| source.referer_value.clone());

        let (url, route, bootstrap) = match (strategy, bootstrap_url) {
            (Some(CdnStrategy::Edge), _) => (
                proxied_url(&self.edge_base, &source.url, referer),
                ProxyStrategy::Edge,
                None,
            ),
            (Some(CdnStrategy::Bootstrap), Some(landing)) => {
                (source.url.clone(), ProxyStrategy::Direct, Some(landing))
            }
            (Some(CdnStrategy::Local), _) | (Some(CdnStrategy::Bootstrap), None) => (
                proxied_url(&self.local_base, &source.url, referer),
                ProxyStrategy::Local,
                None,
            ),
            (None, _) => (source.url.clone(), ProxyStrategy::Direct, None),
        };

        let mut fragment_headers = BTreeMap::new();
        if let Some(landing) = &bootstrap {
            let value = referer.unwrap_or(landing);
            fragment_headers.insert("Referer".to_string(), value.to_string());
        }

        tracing::debug!(
            "{} source {} -> {:?}{}",
            source.origin_provider,
            source.url,
            route,
            if bootstrap.is_some() { " with bootstrap" } else { "" }
        );

        PlayableUrl {
            url,
            strategy: route,
            requires_session_bootstrap: bootstrap.is_some(),
            session_bootstrap_url: bootstrap,
            fragment_headers,
            tracks: source
                .track_list
                .iter()
                .map(|track| self.rewrite_track(track, source))
                .collect(),
            quality_label: source.quality_label.clone(),
            container: source.container,
        }
    }

    /// Tracks take their own proxy decision, sharing only the source's referer
    fn rewrite_track(&self, track: &Track, source: &CandidateSource) -> Track {
        let referer = source.referer_value.as_deref();
        let url = match self.classifier.classify(&track.url) {
            Some(CdnStrategy::Edge) => proxied_url(&self.edge_base, &track.url, referer),
            Some(CdnStrategy::Local) => proxied_url(&self.local_base, &track.url, referer),
            Some(CdnStrategy::Bootstrap) => track.url.clone(),
            None if source.requires_referer => {
                proxied_url(&self.local_base, &track.url, referer)
            }
            None => track.url.clone(),
        };
        Track {
            url,
            kind: track.kind,
            language: track.language.clone(),
        }
    }
}
