//! Shared HTTP plumbing for provider adapters
//!
//! Every adapter talks to a first-party JSON endpoint. This client applies the per-call
//! timeout and maps failures onto the error taxonomy: 502/503 and timeouts become
//! `TransientUpstream`, other non-success statuses become `Upstream`.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

use crate::{Error, Result, config::Settings, types::ProviderKind};

/// HTTP client bound to one provider's base URL
#[derive(Debug, Clone)]
pub struct ProviderHttp {
    client: Client,
    base_url: Url,
    provider: ProviderKind,
    transient_statuses: Arc<[u16]>,
}

impl ProviderHttp {
    /// Build a client from settings for the given provider
    pub fn new(provider: ProviderKind, settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.providers.user_agent.clone())
            .timeout(settings.providers.request_timeout())
            .build()?;

        Self::with_client(
            provider,
            client,
            &settings.providers.endpoint(provider).base_url,
            &settings.retry.transient_statuses,
        )
    }

    /// Build around an existing client
    pub fn with_client(
        provider: ProviderKind,
        client: Client,
        base_url: &str,
        transient_statuses: &[u16],
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid base_url for {}: {}", provider, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base_url for {} cannot carry path segments",
                provider
            )));
        }

        Ok(Self {
            client,
            base_url,
            provider,
            transient_statuses: transient_statuses.into(),
        })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Base URL joined with percent-encoded path segments
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET a path with query parameters and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut url = self.endpoint(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        self.fetch_json(url).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("{} GET {}", self.provider, url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.classify_status(status, url.path()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        serde_json::from_slice(&body).map_err(|e| {
            Error::upstream(
                self.provider,
                status.as_u16(),
                format!("unexpected payload from {}: {}", url.path(), e),
            )
        })
    }

    fn classify_status(&self, status: StatusCode, path: &str) -> Error {
        if self.transient_statuses.contains(&status.as_u16()) {
            Error::transient(self.provider, format!("HTTP {} from {}", status.as_u16(), path))
        } else if status == StatusCode::NOT_FOUND {
            Error::not_found(self.provider, format!("HTTP 404 from {}", path))
        } else {
            Error::upstream(self.provider, status.as_u16(), format!("from {}", path))
        }
    }

    fn classify_send_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::transient(self.provider, format!("timed out: {}", error))
        } else {
            Error::Network(error)
        }
    }
}
