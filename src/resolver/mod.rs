//! Identifier resolution and source orchestration
//!
//! - [`IdentifierResolver`] maps a request onto one provider's native ids.
//! - [`RetryPolicy`] bounds retries of individual fetches.
//! - [`SourceOrchestrator`] walks providers, categories and servers to find a source set.

pub mod identity;
pub mod orchestrator;
pub mod retry;

pub use identity::{IdentifierResolver, SeriesLookup, has_season_marker, remap_season_numbering};
pub use orchestrator::{Resolution, SourceOrchestrator, category_order, rank_sources};
pub use retry::RetryPolicy;
