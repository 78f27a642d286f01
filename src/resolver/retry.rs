//! Bounded retry for individual provider fetches
//!
//! Transient failures (502/503, timeouts) get a fixed number of extra attempts with a constant
//! delay. Anything else is returned immediately so the orchestrator can move on.

use backon::{BackoffBuilder, ConstantBuilder};
use std::future::Future;
use std::time::Duration;

use crate::{Error, Result, config::RetrySettings};

/// Constant-delay retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_retries, settings.delay())
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Run `op`, retrying while it fails transiently and the schedule allows
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let backoff = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_retries)
            .build();

        let mut last_err: Option<Error> = None;
        for delay in std::iter::once(Duration::ZERO).chain(backoff) {
            if let Some(err) = &last_err {
                tracing::warn!("{} failed: {} - retrying in {:?}", label, err, delay);
                tokio::time::sleep(delay).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::internal(format!("{}: retry exhausted", label))))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}
