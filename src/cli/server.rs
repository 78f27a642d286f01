//! Server mode CLI logic
//!
//! Loads configuration, binds the listener and serves the resolver API.

use crate::{config::ConfigLoader, server::app, utils::version};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Arguments for server mode
#[derive(Debug)]
pub struct ServerArgs {
    pub port: u16,
    pub host: String,
    pub verbose: bool,
    /// Optional TOML configuration file
    pub config: Option<PathBuf>,
}

/// Run server mode with the given arguments
pub async fn run_server_mode(args: ServerArgs) -> Result<()> {
    let mut settings = ConfigLoader::new()
        .load(args.config.as_deref())
        .context("failed to load configuration")?;
    settings.server.host = args.host.clone();
    settings.server.port = args.port;
    if args.verbose {
        settings.logging.verbose = true;
    }

    let directive = if settings.logging.verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    super::init_tracing(directive);

    tracing::info!("Starting resolver server v{}", version::get_version());
    tracing::debug!("Provider priority: {:?}", settings.providers.priority);

    let app = app::create_app(settings.clone())?;

    let addr = parse_and_bind_address(&args.host, args.port).await?;

    tracing::info!(
        "Resolver server v{} listening on {}",
        version::get_version(),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse host string and attempt to bind to the address
///
/// Literal IPs are taken as-is. `::` is tried first and falls back to `0.0.0.0` on hosts
/// without IPv6.
pub async fn parse_and_bind_address(host: &str, port: u16) -> Result<std::net::SocketAddr> {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    // Try to parse as IP address first
    if let Ok(ip) = host.parse::<IpAddr>() {
        let addr = SocketAddr::new(ip, port);
        tracing::debug!("Parsed address: {}", addr);
        return Ok(addr);
    }

    // Handle special cases like "::" for IPv6 any
    match host {
        "::" => {
            let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
            tracing::debug!("Using IPv6 any address: {}", addr);

            // Test if we can bind to IPv6
            match tokio::net::TcpListener::bind(addr).await {
                Ok(_) => {
                    tracing::info!("Successfully bound to IPv6 address {}", addr);
                    Ok(addr)
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not listen on [::]:{} (Caused by {}), falling back to 0.0.0.0",
                        port,
                        e
                    );
                    let fallback_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
                    tracing::info!("Using IPv4 fallback address: {}", fallback_addr);
                    Ok(fallback_addr)
                }
            }
        }
        "0.0.0.0" => {
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
            tracing::info!("Using IPv4 any address: {}", addr);
            Ok(addr)
        }
        _ => {
            anyhow::bail!(
                "Invalid host address: {}. Use '::' for IPv6 or '0.0.0.0' for IPv4",
                host
            );
        }
    }
}
