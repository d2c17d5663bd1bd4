//! webmind CLI — the main entry point.
//!
//! Commands:
//! - `chat`     — Interactive session with search/browse/http tools and memory
//! - `context`  — Research a query once and print the assembled context
//! - `config`   — Show, locate or validate the configuration

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use webmind_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "webmind",
    about = "webmind — a research agent with bounded, relevance-ranked memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (default)
    Chat,

    /// Search the web for a query and print the assembled context
    Context {
        /// The research query
        query: String,

        /// Number of search results to browse
        #[arg(short, long)]
        sources: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load();
    let level = match &config {
        Ok(config) => config.log_level.clone(),
        Err(_) => "info".into(),
    };
    init_tracing(cli.verbose, &level);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(config?).await?,
        Commands::Context { query, sources } => {
            commands::context::run(config?, &query, sources).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config?),
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Validate => commands::config_cmd::validate(config),
        },
    }

    Ok(())
}

/// `RUST_LOG` wins, then `--verbose`, then the configured level.
fn init_tracing(verbose: bool, level: &str) {
    let fallback = if verbose { "debug" } else { level };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
