//! CLI argument parsing for catalog-ingest.
//!
//! CLI flags override all other config sources. Credentials can also be
//! passed through the conventional `TMDB_*` / `QDRANT_*` environment
//! variables.

use clap::{Args, Parser, Subcommand};

/// Catalog Ingest
///
/// Sweeps a paginated movie catalog, embeds every synopsis and writes the
/// vectors into a vector index.
#[derive(Parser, Debug)]
#[command(name = "catalog-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/catalog-ingest/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Endpoints and credentials, usually taken from the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Catalog API key
    #[arg(long, env = "TMDB_API_KEY", global = true, hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    /// Catalog read access token (sent as a bearer token)
    #[arg(long, env = "TMDB_READ_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub tmdb_read_access_token: Option<String>,

    /// Remote vector service URL; the local store is used when unset
    #[arg(long, env = "QDRANT_URL", global = true)]
    pub qdrant_url: Option<String>,

    /// Remote vector service API key
    #[arg(long, env = "QDRANT_API_KEY", global = true, hide_env_values = true)]
    pub qdrant_api_key: Option<String>,
}

/// Commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sweep over the catalog and index every record
    Sweep(SweepArgs),

    /// Show the target collection's configuration and point count
    Status,

    /// Resolve a title and list the catalog's related titles
    Related {
        /// Title to look up
        title: String,

        /// Maximum results to print
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

/// Sweep overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// First page to fetch
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Last page to fetch (inclusive)
    #[arg(long)]
    pub end_page: Option<u32>,

    /// Points per batch upsert
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Pause after every page, in milliseconds
    #[arg(long)]
    pub page_delay_ms: Option<u64>,

    /// Continue from the checkpoint file
    #[arg(long)]
    pub resume: bool,

    /// Checkpoint file path
    #[arg(long)]
    pub checkpoint: Option<String>,
}
