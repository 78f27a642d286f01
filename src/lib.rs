//! Playback Resolver
//!
//! Turns a canonical media request (title, season, episode, optional catalog id) into a
//! playable stream. Several upstream providers are tried in priority order, each with its own
//! identifier scheme; the winning source is wrapped in the delivery strategy its CDN needs and
//! handed to a single-engine playback controller.
//!
//! # Architecture
//!
//! - **Providers**: adapters that search, list episodes and fetch per-category server sets
//! - **Resolver**: identifier caching plus the orchestrator that walks providers, categories
//!   and servers with bounded retries
//! - **Proxy**: CDN classification, playable url construction and manifest rewriting
//! - **Session**: the player controller, engine event bridge, bootstrapping and resume store
//! - **Server**: an HTTP surface exposing resolution and the first-party referer proxy
//!
//! # Usage
//!
//! ## HTTP Server Mode
//!
//! ```bash
//! playback-resolver-server --port 4417 --host 0.0.0.0
//! ```
//!
//! ## One-shot Mode
//!
//! ```bash
//! playback-resolver "Frieren" --season 1 --episode 7
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use playback_resolver::{MediaRequest, SourceOrchestrator, Settings, session::RequestToken};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let orchestrator = SourceOrchestrator::from_settings(&settings)?;
//! let request = MediaRequest::series("Frieren", 1, 7);
//! let resolution = orchestrator
//!     .obtain_sources(&request, None, &[], &RequestToken::detached())
//!     .await?;
//! println!("{} via {}", resolution.server, resolution.provider);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod proxy;
pub mod resolver;
pub mod server;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use error::{Error, Result};
pub use proxy::{PlayableUrl, ProxyStrategy, ProxyStrategyBuilder};
pub use resolver::{Resolution, SourceOrchestrator};
pub use session::{PlayerController, PlayerState};
pub use types::{
    Category, ErrorResponse, MediaRequest, PingResponse, ProviderKind, ResolveRequest,
    ResolveResponse,
};
