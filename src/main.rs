//! # Tesserae CLI (`tv5`)
//!
//! ## Usage
//!
//! ```bash
//! tv5 --config ./config/tv5.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tv5 init` | Create the SQLite database and run schema migrations |
//! | `tv5 load <file>` | Load texts, units and stopword lists from a JSON manifest |
//! | `tv5 get <urn>` | Print a text by CTS URN |
//! | `tv5 stats` | Summarize the loaded corpus |
//! | `tv5 serve` | Start the HTTP API server |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `info,sqlx=warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tesserae_api::{config, get, load, migrate, server, stats};

/// Tesserae v5 API: CTS-addressed texts and parallel search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tv5.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tv5",
    about = "Tesserae v5: metadata, unit and parallel-search API for classical texts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tv5.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Load a corpus manifest.
    ///
    /// The manifest is a JSON object with optional `texts`, `units` and
    /// `stopword_lists` arrays. Texts already present are skipped; units
    /// must belong to the text their `text` path refers to.
    Load {
        /// Path to the manifest file.
        file: PathBuf,
    },

    /// Print a text by its CTS URN.
    Get {
        /// Work-level CTS URN, e.g. `urn:cts:latinLit:phi0917.phi001`.
        cts_urn: String,
    },

    /// Show corpus statistics.
    Stats,

    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load { file } => {
            load::run_load(&cfg, &file).await?;
        }
        Commands::Get { cts_urn } => {
            get::run_get(&cfg, &cts_urn).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
