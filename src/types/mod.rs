//! Type definitions for the resolver
//!
//! This module contains the data model shared by providers, the orchestrator and the
//! playback session, plus the HTTP request and response bodies.

pub mod attempt;
pub mod identity;
pub mod request;
pub mod response;
pub mod serde_helpers;
pub mod source;

pub use attempt::{AttemptEntry, AttemptOutcome, ResolutionAttemptLog};
pub use identity::{EpisodeEntry, IdentityScheme, ProviderIdentity, ProviderKind, SearchHit};
pub use request::{Category, DeepLink, MediaKind, MediaRequest};
pub use response::{ErrorResponse, PingResponse, QualityOption, ResolveRequest, ResolveResponse};
pub use source::{
    CandidateSource, Container, ServerSources, Track, TrackKind, normalize_quality_label,
};
