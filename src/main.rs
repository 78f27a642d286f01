//! One-shot resolution binary
//!
//! Resolves a single title to a playable source and prints it to stdout.
//!
//! # Usage
//!
//! ```bash
//! playback-resolver "Frieren" --season 1 --episode 7 --provider watch_id
//! playback-resolver --movie "Perfect Blue" --category dub
//! ```
//!
//! # Output
//!
//! On success a JSON object with the selected playable url, the alternative qualities of the
//! same server and the attempt log. On failure `{}` is printed, the reason goes to stderr and
//! the process exits with status 1.

use clap::Parser;
use std::path::PathBuf;

use playback_resolver::{
    cli::{self, ResolveArgs},
    types::{Category, ProviderKind},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "playback-resolver")]
struct Cli {
    /// Title to resolve
    #[arg(value_name = "TITLE", required_unless_present = "canonical_id")]
    title: Option<String>,

    /// Season number
    #[arg(short, long, default_value = "1")]
    season: u32,

    /// Episode number
    #[arg(short, long, default_value = "1")]
    episode: u32,

    /// Resolve a movie instead of an episode
    #[arg(short, long)]
    movie: bool,

    /// External catalog id
    #[arg(long, value_name = "ID")]
    canonical_id: Option<String>,

    /// Provider to try first (tmdb_embed, episode_session, watch_id, title_search)
    #[arg(short, long, value_name = "PROVIDER")]
    provider: Option<ProviderKind>,

    /// Category to try first (sub, dub, raw)
    #[arg(short, long, value_name = "CATEGORY")]
    category: Option<Category>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn resolve_args(&self) -> ResolveArgs {
        ResolveArgs {
            title: self.title.clone().unwrap_or_default(),
            season: self.season,
            episode: self.episode,
            movie: self.movie,
            canonical_id: self.canonical_id.clone(),
            provider: self.provider,
            category: self.category,
            config: self.config.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    cli::init_tracing(if cli.verbose { "debug" } else { "error" });

    match cli::run_resolve_mode(&cli.resolve_args()).await {
        Ok(response) => {
            println!("{}", serde_json::to_string(&response)?);
            tracing::info!(
                "Resolved via {}/{}/{}",
                response.provider,
                response.category,
                response.server
            );
        }
        Err(e) => {
            eprintln!("Failed to resolve a playable source. Error: {:#}", e);
            println!("{{}}");
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_args_from_cli() {
        let cli = Cli::parse_from([
            "playback-resolver",
            "Frieren",
            "-s",
            "2",
            "-e",
            "5",
            "--provider",
            "title-search",
            "--category",
            "dub",
        ]);

        let args = cli.resolve_args();
        assert_eq!(args.title, "Frieren");
        assert_eq!(args.season, 2);
        assert_eq!(args.episode, 5);
        assert_eq!(args.provider, Some(ProviderKind::TitleSearch));
        assert_eq!(args.category, Some(Category::Dub));
        assert!(!args.movie);
    }

    #[test]
    fn test_canonical_id_replaces_title() {
        let cli = Cli::parse_from(["playback-resolver", "--canonical-id", "209867"]);
        assert_eq!(cli.resolve_args().title, "");
        assert_eq!(cli.resolve_args().canonical_id.as_deref(), Some("209867"));
    }

    #[test]
    fn test_title_or_id_required() {
        assert!(Cli::try_parse_from(["playback-resolver"]).is_err());
        assert!(Cli::try_parse_from(["playback-resolver", "--provider", "nope", "x"]).is_err());
    }
}
