//! Resolution attempt log
//!
//! Ordered diagnostics for one resolution pass. Built fresh per pass and discarded
//! once the pass concludes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{identity::ProviderKind, request::Category};

/// Outcome of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Error,
}

/// One provider/category/server attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptEntry {
    pub provider: ProviderKind,
    pub category: Option<Category>,
    pub server: Option<String>,
    pub outcome: AttemptOutcome,
    pub message: String,
}

impl fmt::Display for AttemptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.provider)?;
        if let Some(category) = self.category {
            write!(f, "/{}", category)?;
        }
        if let Some(server) = &self.server {
            write!(f, "/{}", server)?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionAttemptLog {
    entries: Vec<AttemptEntry>,
}

impl ResolutionAttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(
        &mut self,
        provider: ProviderKind,
        category: Option<Category>,
        server: Option<&str>,
        message: impl Into<String>,
    ) {
        self.push(provider, category, server, AttemptOutcome::Error, message);
    }

    pub fn record_success(
        &mut self,
        provider: ProviderKind,
        category: Option<Category>,
        server: Option<&str>,
        message: impl Into<String>,
    ) {
        self.push(provider, category, server, AttemptOutcome::Success, message);
    }

    fn push(
        &mut self,
        provider: ProviderKind,
        category: Option<Category>,
        server: Option<&str>,
        outcome: AttemptOutcome,
        message: impl Into<String>,
    ) {
        self.entries.push(AttemptEntry {
            provider,
            category,
            server: server.map(str::to_string),
            outcome,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[AttemptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &AttemptEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome == AttemptOutcome::Error)
    }

    /// All attempt messages concatenated in order
    pub fn summary(&self) -> String {
        if self.entries.is_empty() {
            return "no providers attempted".to_string();
        }
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
