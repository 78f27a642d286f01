//! Command line entry points
//!
//! Shared logic behind the binaries: one-shot resolution and the long-running HTTP server.

pub mod resolve;
pub mod server;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use resolve::{ResolveArgs, run_resolve_mode};
pub use server::{ServerArgs, parse_and_bind_address, run_server_mode};

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` wins over `default_directive` when set.
pub fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
