//! Adaptive manifest rewriting
//!
//! Playlists fetched through the first-party proxy reference segments, keys and variant
//! playlists on the same referer-gated CDN. Every such reference is resolved against the
//! manifest URL and routed back through the proxy with the same referer.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

use super::strategy::proxied_url;

static URI_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"URI="([^"]*)""#).expect("URI attribute regex should compile"));

/// Whether a body is an adaptive manifest
pub fn is_manifest(body: &[u8]) -> bool {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    body.trim_ascii_start().starts_with(b"#EXTM3U")
}

/// Rewrites manifest references to go through a proxy endpoint
#[derive(Debug, Clone)]
pub struct ManifestRewriter<'a> {
    proxy_base: &'a Url,
    manifest_url: &'a Url,
    referer: Option<&'a str>,
}

impl<'a> ManifestRewriter<'a> {
    pub fn new(proxy_base: &'a Url, manifest_url: &'a Url, referer: Option<&'a str>) -> Self {
        Self {
            proxy_base,
            manifest_url,
            referer,
        }
    }

    pub fn rewrite(&self, manifest: &str) -> String {
        let mut out = String::with_capacity(manifest.len() * 2);
        for line in manifest.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                out.push_str(line);
            } else if trimmed.starts_with('#') {
                let rewritten = URI_ATTRIBUTE.replace_all(line, |caps: &Captures<'_>| {
                    format!("URI=\"{}\"", self.proxy(&caps[1]))
                });
                out.push_str(&rewritten);
            } else {
                out.push_str(&self.proxy(trimmed));
            }
            out.push('\n');
        }
        out
    }

    fn proxy(&self, reference: &str) -> String {
        // data: URIs and unparsable references are left untouched
        if reference.starts_with("data:") {
            return reference.to_string();
        }
        match self.manifest_url.join(reference) {
            Ok(absolute) => proxied_url(self.proxy_base, absolute.as_str(), self.referer),
            Err(_) => reference.to_string(),
        }
    }
}
