//! catalog-ingest library exports.
//!
//! This crate provides the `catalog-ingest` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (sweep, status, related)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, CredentialArgs, SweepArgs};
pub use commands::{
    apply_overrides, apply_sweep_overrides, init_logging, load_encoder, load_settings, open_store,
    print_report, run_sweep, show_related, show_status,
};
