//! Playback session management
//!
//! This module owns the live playback side: the [`PlayerController`] state machine that is
//! the only component allowed to create or destroy engine instances, the event bridge that
//! turns engine telemetry into state transitions and failover, session bootstrapping for
//! gated embeds, superseding tokens, and resume position persistence.

pub mod bootstrap;
pub mod bridge;
pub mod controller;
pub mod engine;
pub mod resume;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::{HttpBootstrapper, NoopBootstrapper, SessionBootstrapper};
pub use bridge::{BridgeAction, FAILOVER_NOTICE, FailoverDecision, PlayerEventBridge};
pub use controller::{PlaybackSession, PlayerController, PlayerState};
pub use engine::{EngineEvent, EngineFactory, PlaybackEngine};
pub use resume::{ResumeEntry, ResumeStore};
pub use token::{Generation, RequestToken};
