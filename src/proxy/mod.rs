//! Proxy/referer handling
//!
//! [`ProxyStrategyBuilder`] decides per source whether the player can fetch it directly or
//! needs the edge or first-party proxy, and whether a session bootstrap must run first.
//! [`ManifestRewriter`] keeps playlists served by the first-party proxy pointing back at it.

pub mod manifest;
pub mod strategy;

pub use manifest::{ManifestRewriter, is_manifest};
pub use strategy::{CdnClassifier, PlayableUrl, ProxyStrategy, ProxyStrategyBuilder, proxied_url};
