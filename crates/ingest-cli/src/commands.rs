//! Command implementations for catalog-ingest.
//!
//! Handles:
//! - sweep: build the catalog client, encoder and vector store, run one sweep
//! - status: describe the target collection
//! - related: resolve a title and list related catalog items

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::info;

use ingest_catalog::{CatalogClient, RetryPolicy};
use ingest_embeddings::{CandleEncoder, EmbeddingModel, ModelCache};
use ingest_pipeline::{SweepConfig, SweepController, SweepReport};
use ingest_types::{non_blank, Settings, VectorSettings};
use ingest_vector::{LocalStore, QdrantStore, VectorIndexWriter, VectorStore};

use crate::cli::{CredentialArgs, SweepArgs};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level: Option<&str>,
    credentials: &CredentialArgs,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    apply_overrides(&mut settings, log_level, credentials);
    Ok(settings)
}

/// Apply global CLI flags on top of loaded settings.
pub fn apply_overrides(
    settings: &mut Settings,
    log_level: Option<&str>,
    credentials: &CredentialArgs,
) {
    if let Some(log_level) = log_level {
        settings.log_level = log_level.to_string();
    }
    if let Some(key) = &credentials.tmdb_api_key {
        settings.catalog.api_key = Some(SecretString::from(key.as_str()));
    }
    if let Some(token) = &credentials.tmdb_read_access_token {
        settings.catalog.read_access_token = Some(SecretString::from(token.as_str()));
    }
    if let Some(url) = &credentials.qdrant_url {
        settings.vector.url = Some(url.clone());
    }
    if let Some(key) = &credentials.qdrant_api_key {
        settings.vector.api_key = Some(SecretString::from(key.as_str()));
    }
}

/// Apply `sweep` flags on top of loaded settings.
pub fn apply_sweep_overrides(settings: &mut Settings, args: &SweepArgs) {
    if let Some(start) = args.start_page {
        settings.sweep.start_page = start;
    }
    if let Some(end) = args.end_page {
        settings.sweep.end_page = end;
    }
    if let Some(batch_size) = args.batch_size {
        settings.sweep.batch_size = batch_size;
    }
    if let Some(delay) = args.page_delay_ms {
        settings.sweep.page_delay_ms = delay;
    }
    if let Some(checkpoint) = &args.checkpoint {
        settings.sweep.checkpoint_path = Some(checkpoint.clone());
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over settings.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the vector store selected by configuration.
pub fn open_store(settings: &VectorSettings) -> Result<Arc<dyn VectorStore>> {
    if settings.is_remote() {
        let url = settings.url.as_deref().unwrap_or_default();
        let store = QdrantStore::new(
            url,
            non_blank(settings.api_key.as_ref()),
            Duration::from_secs(settings.timeout_secs),
        )
        .context("Failed to configure vector service client")?;
        info!(url, "Using remote vector store");
        Ok(Arc::new(store))
    } else {
        let path = settings.expanded_path();
        let store = LocalStore::open(&path)
            .with_context(|| format!("Failed to open local vector store at {:?}", path))?;
        info!(path = ?path, "Using local vector store");
        Ok(Arc::new(store))
    }
}

/// Load the sentence encoder described by settings.
pub fn load_encoder(settings: &Settings) -> Result<Arc<dyn EmbeddingModel>> {
    let mut cache = ModelCache::for_repo(
        settings.embedding.cache_dir.as_deref(),
        &settings.embedding.model_repo,
    );
    if let Some(revision) = &settings.embedding.revision {
        cache = cache.with_revision(revision);
    }
    let encoder = CandleEncoder::load(&cache).context("Failed to load embedding model")?;
    Ok(Arc::new(encoder))
}

/// Run one sweep with fully resolved settings.
pub async fn run_sweep(settings: &Settings, resume: bool) -> Result<SweepReport> {
    settings.validate().context("Invalid configuration")?;

    info!("Catalog ingest starting...");
    info!("Configuration:");
    info!("  Catalog: {}{}", settings.catalog.base_url, settings.catalog.list_path);
    info!(
        "  Pages: {}..={}",
        settings.sweep.start_page, settings.sweep.end_page
    );
    info!("  Collection: {}", settings.vector.collection);
    info!("  Batch size: {}", settings.sweep.batch_size);

    let catalog = CatalogClient::from_settings(&settings.catalog, RetryPolicy::from(&settings.retry))
        .context("Failed to configure catalog client")?;
    let store = open_store(&settings.vector)?;
    let encoder = load_encoder(settings)?;

    let config = SweepConfig {
        resume,
        ..SweepConfig::from_settings(settings)
    };
    let controller = SweepController::new(
        Arc::new(catalog),
        encoder,
        VectorIndexWriter::new(store),
        config,
    );

    controller.run().await.context("Sweep aborted")
}

/// Print the sweep summary.
pub fn print_report(report: &SweepReport) {
    println!("{}", report);
    println!(
        "  pages fetched: {}  skipped: {}  malformed: {}  encode failures: {}",
        report.pages_fetched, report.skipped, report.malformed, report.encode_failures
    );
    println!(
        "  flushes: {}  failed flushes: {}  points written: {}",
        report.flushes,
        report.failed_flushes,
        report.points_written()
    );
}

/// Show the target collection's configuration and point count.
pub async fn show_status(settings: &Settings) -> Result<()> {
    let store = open_store(&settings.vector)?;
    let collection = &settings.vector.collection;

    match store
        .collection_info(collection)
        .await
        .context("Failed to query vector store")?
    {
        Some(config) => {
            let count = store
                .count(collection)
                .await
                .context("Failed to count points")?;
            println!(
                "Collection '{}' ({} store): {}, {} points",
                collection,
                store.backend(),
                config,
                count
            );
            if config.vector_size != settings.vector.vector_size
                || config.distance != settings.vector.distance
            {
                println!(
                    "  WARNING: configured size={} distance={} does not match",
                    settings.vector.vector_size, settings.vector.distance
                );
            }
        }
        None => {
            println!(
                "Collection '{}' does not exist ({} store)",
                collection,
                store.backend()
            );
        }
    }
    Ok(())
}

/// Resolve `title` and print up to `limit` related catalog items.
pub async fn show_related(settings: &Settings, title: &str, limit: usize) -> Result<()> {
    let catalog = CatalogClient::from_settings(&settings.catalog, RetryPolicy::from(&settings.retry))
        .context("Failed to configure catalog client")?;

    let Some(id) = catalog
        .resolve_id(title)
        .await
        .context("Catalog search failed")?
    else {
        println!("No catalog entry matches '{}'", title);
        return Ok(());
    };

    let related = catalog
        .related(id)
        .await
        .context("Failed to fetch related titles")?;
    if related.is_empty() {
        println!("No related titles for '{}' (id {})", title, id);
        return Ok(());
    }

    println!("Related to '{}' (id {}):", title, id);
    for record in related.iter().take(limit) {
        println!(
            "  {:>8}  {} ({})  rating {:.1}",
            record.id,
            record.title(),
            record.year().unwrap_or("----"),
            record.vote_average.unwrap_or(0.0)
        );
    }
    Ok(())
}
