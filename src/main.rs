mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use clipdex::config::ClipdexConfig;

#[derive(Parser)]
#[command(name = "clipdex", version, about = "Image embedding store with similarity search")]
struct Cli {
    /// Config file (defaults to ~/.clipdex/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Embed and store image files or directories
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Find stored images most similar to a text query or an image file
    Search {
        /// Free-text query
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        text: Option<String>,
        /// Query image file
        #[arg(long)]
        image: Option<PathBuf>,
        /// Number of results
        #[arg(short)]
        k: Option<usize>,
    },
    /// Show store statistics and a health report
    Stats,
    /// Delete every stored image (asks for confirmation)
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = match &cli.config {
        Some(path) => ClipdexConfig::load_from(path)?,
        None => ClipdexConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            let store = Arc::new(cli::open_store(&config)?);
            tracing::info!(images = store.count()?, dim = store.dimensions(), "image store ready");
            let embedding = cli::open_provider(&config)?;
            clipdex::server::serve(config, store, embedding).await?;
        }
        Command::Ingest { paths } => {
            cli::ingest::ingest(&config, &paths).await?;
        }
        Command::Search { text, image, k } => {
            let query = match (text, image) {
                (Some(text), _) => cli::search::SearchQuery::Text(text),
                (None, Some(image)) => cli::search::SearchQuery::Image(image),
                (None, None) => anyhow::bail!("pass --text or --image"),
            };
            cli::search::search(&config, query, k).await?;
        }
        Command::Stats => {
            cli::stats::stats(&config)?;
        }
        Command::Reset => {
            cli::reset::reset(&config)?;
        }
    }

    Ok(())
}
