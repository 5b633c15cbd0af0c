//! Configuration loading for catalog ingestion.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/catalog-ingest/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::IngestError;
use crate::point::Distance;

/// Catalog API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// API base URL
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Paginated list endpoint swept page by page
    #[serde(default = "default_list_path")]
    pub list_path: String,

    /// Response language
    #[serde(default = "default_language")]
    pub language: String,

    /// Optional sort order passed to the list endpoint
    #[serde(default)]
    pub sort_by: Option<String>,

    /// API key (sent as the `api_key` query parameter)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Optional bearer token sent in the Authorization header
    #[serde(default, skip_serializing)]
    pub read_access_token: Option<SecretString>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_catalog_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_list_path() -> String {
    "/movie/top_rated".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!("catalog-ingest/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            list_path: default_list_path(),
            language: default_language(),
            sort_by: None,
            api_key: None,
            read_access_token: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry policy for catalog requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (ms)
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Growth factor applied to the delay after each retry
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound for any single delay, including Retry-After (ms)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Vector store settings.
///
/// When `url` is set the remote vector service is used; otherwise points are
/// written to the local store under `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSettings {
    /// Remote vector service endpoint
    #[serde(default)]
    pub url: Option<String>,

    /// Remote vector service API key
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Local store directory
    #[serde(default = "default_vector_path")]
    pub path: String,

    /// Target collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Vector dimension of the collection
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,

    /// Distance metric of the collection
    #[serde(default)]
    pub distance: Distance,

    /// Request timeout for the remote service in seconds
    #[serde(default = "default_vector_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_vector_path() -> String {
    ProjectDirs::from("", "", "catalog-ingest")
        .map(|p| p.data_local_dir().join("vector-store"))
        .unwrap_or_else(|| PathBuf::from("./vector-store"))
        .to_string_lossy()
        .to_string()
}

fn default_collection() -> String {
    "movies".to_string()
}

fn default_vector_size() -> usize {
    384 // all-MiniLM-L6-v2
}

fn default_vector_timeout_secs() -> u64 {
    30
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            path: default_vector_path(),
            collection: default_collection(),
            vector_size: default_vector_size(),
            distance: Distance::default(),
            timeout_secs: default_vector_timeout_secs(),
        }
    }
}

impl VectorSettings {
    /// Whether the remote vector service is configured.
    pub fn is_remote(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Expand ~ in the local store path
    pub fn expanded_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

/// What happens to a batch the vector store refused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlushFailurePolicy {
    /// Log, count the lost points and keep sweeping
    #[default]
    Drop,
    /// Put the batch back and retry it with the next flush
    Retain,
}

/// Sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// First page to fetch (1-based)
    #[serde(default = "default_start_page")]
    pub start_page: u32,

    /// Last page to fetch, inclusive
    #[serde(default = "default_end_page")]
    pub end_page: u32,

    /// Points buffered before a flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause after every page (ms)
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Flush failure handling
    #[serde(default)]
    pub flush_failure: FlushFailurePolicy,

    /// Stop after the last page the catalog reports
    #[serde(default = "default_respect_total_pages")]
    pub respect_total_pages: bool,

    /// Checkpoint file for resumable sweeps
    #[serde(default)]
    pub checkpoint_path: Option<String>,

    /// Consecutive failed flushes a retained batch survives before it is dropped
    #[serde(default = "default_max_flush_retries")]
    pub max_flush_retries: u32,
}

fn default_start_page() -> u32 {
    1
}

fn default_end_page() -> u32 {
    500
}

fn default_batch_size() -> usize {
    100
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_respect_total_pages() -> bool {
    true
}

fn default_max_flush_retries() -> u32 {
    3
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            start_page: default_start_page(),
            end_page: default_end_page(),
            batch_size: default_batch_size(),
            page_delay_ms: default_page_delay_ms(),
            flush_failure: FlushFailurePolicy::default(),
            respect_total_pages: default_respect_total_pages(),
            checkpoint_path: None,
            max_flush_retries: default_max_flush_retries(),
        }
    }
}

impl SweepSettings {
    /// Expand ~ in the checkpoint path
    pub fn expanded_checkpoint_path(&self) -> Option<PathBuf> {
        self.checkpoint_path.as_deref().map(expand_home)
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// HuggingFace repository of the sentence-transformer model
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model file cache directory (defaults to the user cache dir)
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Hub revision (branch, tag or commit) to pin the model to
    #[serde(default)]
    pub revision: Option<String>,
}

fn default_model_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_repo: default_model_repo(),
            cache_dir: None,
            revision: None,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub vector: VectorSettings,

    #[serde(default)]
    pub sweep: SweepSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            catalog: CatalogSettings::default(),
            retry: RetrySettings::default(),
            vector: VectorSettings::default(),
            sweep: SweepSettings::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/catalog-ingest/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (INGEST__SECTION__KEY)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, IngestError> {
        let config_dir = ProjectDirs::from("", "", "catalog-ingest")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            // 1. Built-in defaults
            .set_default("log_level", default_log_level())
            .map_err(|e| IngestError::Config(e.to_string()))?
            .set_default("vector.collection", default_collection())
            .map_err(|e| IngestError::Config(e.to_string()))?
            .set_default("vector.path", default_vector_path())
            .map_err(|e| IngestError::Config(e.to_string()))?
            .set_default("sweep.batch_size", default_batch_size() as i64)
            .map_err(|e| IngestError::Config(e.to_string()))?
            // 2. Default config file
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        // 3. CLI-specified config file (higher precedence than default)
        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // 4. Environment variables, e.g. INGEST__SWEEP__BATCH_SIZE=50
        builder = builder.add_source(
            Environment::with_prefix("INGEST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| IngestError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| IngestError::Config(e.to_string()))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), IngestError> {
        let invalid = |msg: String| Err(IngestError::Config(msg));

        if self.sweep.start_page == 0 {
            return invalid("sweep.start_page must be >= 1".to_string());
        }
        if self.sweep.end_page == u32::MAX {
            return invalid(format!("sweep.end_page must be < {}", u32::MAX));
        }
        if self.sweep.end_page < self.sweep.start_page {
            return invalid(format!(
                "sweep.end_page ({}) must be >= sweep.start_page ({})",
                self.sweep.end_page, self.sweep.start_page
            ));
        }
        if self.sweep.batch_size == 0 {
            return invalid("sweep.batch_size must be > 0".to_string());
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be >= 1".to_string());
        }
        if self.retry.multiplier < 1.0 {
            return invalid(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            ));
        }
        if self.vector.vector_size == 0 {
            return invalid("vector.vector_size must be > 0".to_string());
        }
        if self.vector.collection.trim().is_empty() {
            return invalid("vector.collection must not be empty".to_string());
        }
        if self.catalog.timeout_secs == 0 {
            return invalid("catalog.timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}

/// The secret, unless it is missing or whitespace.
pub fn non_blank(secret: Option<&SecretString>) -> Option<&SecretString> {
    secret.filter(|s| !s.expose_secret().trim().is_empty())
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.catalog.base_url, "https://api.themoviedb.org/3");
        assert_eq!(settings.catalog.timeout_secs, 15);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.initial_backoff_ms, 1_000);
        assert_eq!(settings.vector.collection, "movies");
        assert_eq!(settings.vector.vector_size, 384);
        assert_eq!(settings.vector.distance, Distance::Cosine);
        assert_eq!(settings.sweep.start_page, 1);
        assert_eq!(settings.sweep.end_page, 500);
        assert_eq!(settings.sweep.batch_size, 100);
        assert_eq!(settings.sweep.page_delay_ms, 500);
        assert_eq!(settings.sweep.flush_failure, FlushFailurePolicy::Drop);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("ingest.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[sweep]
end_page = 20
flush_failure = "retain"

[vector]
url = "http://localhost:6333"
distance = "dot"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.sweep.end_page, 20);
        assert_eq!(settings.sweep.start_page, 1);
        assert_eq!(settings.sweep.flush_failure, FlushFailurePolicy::Retain);
        assert!(settings.vector.is_remote());
        assert_eq!(settings.vector.distance, Distance::Dot);
        assert_eq!(settings.vector.collection, "movies");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.sweep.batch_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sweep.start_page = 10;
        settings.sweep.end_page = 5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retry.max_attempts = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retry.multiplier = 0.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sweep.end_page = u32::MAX;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_secrets_redacted_and_not_serialized() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("ingest.toml");
        std::fs::write(
            &path,
            r#"
[catalog]
api_key = "tmdb-secret"

[vector]
api_key = "qdrant-secret"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(
            settings.catalog.api_key.as_ref().map(|k| k.expose_secret()),
            Some("tmdb-secret")
        );

        let debug = format!("{:?}", settings);
        assert!(!debug.contains("tmdb-secret"));
        assert!(!debug.contains("qdrant-secret"));

        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_non_blank() {
        let blank = SecretString::from("  ");
        let key = SecretString::from("k");
        assert!(non_blank(None).is_none());
        assert!(non_blank(Some(&blank)).is_none());
        assert!(non_blank(Some(&key)).is_some());
    }

    #[test]
    fn test_is_remote() {
        let mut vector = VectorSettings::default();
        assert!(!vector.is_remote());
        vector.url = Some("  ".to_string());
        assert!(!vector.is_remote());
        vector.url = Some("https://cluster.example.com:6333".to_string());
        assert!(vector.is_remote());
    }

    #[test]
    fn test_flush_failure_policy_serialization() {
        let json = serde_json::to_string(&FlushFailurePolicy::Retain).unwrap();
        assert_eq!(json, "\"retain\"");
        let parsed: FlushFailurePolicy = serde_json::from_str("\"drop\"").unwrap();
        assert_eq!(parsed, FlushFailurePolicy::Drop);
    }
}
