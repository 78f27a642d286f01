//! Playback engine contract
//!
//! The adaptive-streaming engine is an external collaborator. Only [`PlayerController`]
//! creates, attaches or destroys instances, and at most one instance is alive per player.
//!
//! [`PlayerController`]: super::PlayerController

use std::collections::BTreeMap;

use crate::Result;

/// Telemetry reported by an engine instance
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// First decodable data is available; position is now writable
    FirstPlayable { duration: Option<f64> },
    DurationChanged(f64),
    TimeUpdate(f64),
    BufferStalled,
    BufferResumed,
    FragmentLoaded { url: String },
    FragmentTimeout { url: String },
    /// Recoverable error handled by the engine itself
    NonFatalError(String),
    /// Unsupported codec, unrecoverable media error and the like
    FatalError(String),
}

/// One engine instance bound to the player's media element
#[async_trait::async_trait]
pub trait PlaybackEngine: Send + Sync {
    async fn attach(&mut self, url: &str, initial_quality: &str) -> Result<()>;

    /// Release every resource; the instance is unusable afterwards
    fn destroy(&mut self);

    fn seek(&mut self, offset_secs: f64) -> Result<()>;

    /// Headers sent with every fragment request
    fn set_fragment_headers(&mut self, headers: &BTreeMap<String, String>);

    fn position(&self) -> f64;

    fn duration(&self) -> Option<f64>;
}

/// Creates engine instances
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn PlaybackEngine>;
}
