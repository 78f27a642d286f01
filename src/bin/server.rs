//! HTTP server binary for playback resolution
//!
//! # Usage
//!
//! ```bash
//! playback-resolver-server --port 4417 --host 0.0.0.0 --config resolver.toml
//! ```
//!
//! # API Endpoints
//!
//! - `POST /resolve`: Resolve a title to a playable source
//! - `GET /proxy`: First-party referer proxy with manifest rewriting
//! - `GET /ping`: Health check endpoint
//! - `POST /invalidate_caches`: Forget cached provider identities

use clap::Parser;
use std::path::PathBuf;

use playback_resolver::cli::{self, ServerArgs};

/// HTTP server for playback resolution
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "4417")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "::")]
    host: String,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    cli::run_server_mode(ServerArgs {
        port: cli.port,
        host: cli.host,
        verbose: cli.verbose,
        config: cli.config,
    })
    .await
}
