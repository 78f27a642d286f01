//! Session bootstrap
//!
//! Some embed origins only accept fragment requests after their landing document was loaded
//! once in the same session. Bootstrapping is best effort: callers log failures and carry on.

use reqwest::Client;
use std::fmt::Debug;

use crate::{Error, Result, config::Settings};

#[async_trait::async_trait]
pub trait SessionBootstrapper: Send + Sync + Debug {
    /// Load the landing document once
    async fn bootstrap(&self, landing_url: &str) -> Result<()>;
}

/// Fetches the landing document over HTTP
#[derive(Debug, Clone)]
pub struct HttpBootstrapper {
    client: Client,
}

impl HttpBootstrapper {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.providers.user_agent.clone())
            .timeout(settings.providers.request_timeout())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SessionBootstrapper for HttpBootstrapper {
    async fn bootstrap(&self, landing_url: &str) -> Result<()> {
        tracing::debug!("Bootstrapping session via {}", landing_url);
        let response = self
            .client
            .get(landing_url)
            .send()
            .await
            .map_err(|e| Error::bootstrap(format!("{}: {}", landing_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::bootstrap(format!(
                "{} returned {}",
                landing_url,
                status.as_u16()
            )));
        }

        // drain the body so the origin sees a complete load
        response
            .bytes()
            .await
            .map_err(|e| Error::bootstrap(format!("{}: {}", landing_url, e)))?;
        Ok(())
    }
}

/// Bootstrapper for hosts where the player performs the load itself
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBootstrapper;

#[async_trait::async_trait]
impl SessionBootstrapper for NoopBootstrapper {
    async fn bootstrap(&self, _landing_url: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_bootstrap_loads_landing_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/e/603"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let bootstrapper = HttpBootstrapper::with_client(Client::new());
        bootstrapper
            .bootstrap(&format!("{}/e/603", server.uri()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bootstrap_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let bootstrapper = HttpBootstrapper::with_client(Client::new());
        let err = bootstrapper
            .bootstrap(&format!("{}/e/603", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Bootstrap(_)));
    }

    #[tokio::test]
    async fn test_noop_bootstrapper() {
        assert!(NoopBootstrapper.bootstrap("https://any.test/").await.is_ok());
    }
}
