//! Catalog Ingest
//!
//! Bulk ingestion of a paginated movie catalog into a vector index.
//!
//! # Usage
//!
//! ```bash
//! catalog-ingest sweep [--start-page N] [--end-page N] [--batch-size N] [--resume]
//! catalog-ingest status
//! catalog-ingest related "The Matrix"
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/catalog-ingest/config.toml)
//! 3. Environment variables (INGEST__*)
//! 4. CLI flags and TMDB_* / QDRANT_* variables

use anyhow::Result;
use clap::Parser;

use catalog_ingest::{
    apply_sweep_overrides, init_logging, load_settings, print_report, run_sweep, show_related,
    show_status, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        &cli.credentials,
    )?;

    match cli.command {
        Commands::Sweep(args) => {
            apply_sweep_overrides(&mut settings, &args);
            init_logging(&settings)?;
            let report = run_sweep(&settings, args.resume).await?;
            print_report(&report);
        }
        Commands::Status => {
            init_logging(&settings)?;
            show_status(&settings).await?;
        }
        Commands::Related { title, limit } => {
            init_logging(&settings)?;
            show_related(&settings, &title, limit).await?;
        }
    }

    Ok(())
}
