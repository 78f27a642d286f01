//! Configuration management for the resolver
//!
//! This module handles loading and managing configuration settings
//! for both the HTTP server and the one-shot resolve command.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    CdnRule, CdnStrategy, EndpointSettings, FailoverSettings, ProviderSettings, ProxySettings,
    ResumeSettings, RetrySettings, Settings,
};
