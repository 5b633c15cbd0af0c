//! On-disk cache of sentence-transformer files.
//!
//! Files are fetched from HuggingFace Hub one at a time, only when missing,
//! and copied into a flat per-repository directory so later runs work
//! offline.

use std::path::PathBuf;

use hf_hub::{api::sync::Api, Repo, RepoType};
use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Encoder used when none is configured
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Hub revision fetched when none is configured
pub const DEFAULT_REVISION: &str = "main";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Files an encoder needs, in download order
pub const MODEL_FILES: [&str; 3] = [CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE];

/// Location of one model's cached files.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCache {
    pub root: PathBuf,
    pub repo_id: String,
    pub revision: String,
}

/// Resolved paths of a fully cached model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

fn user_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("catalog-ingest")
        .join("models")
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::for_repo(None, DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            repo_id: repo_id.into(),
            revision: DEFAULT_REVISION.to_string(),
        }
    }

    /// Cache for `repo_id` under `root`, or under the user cache directory.
    pub fn for_repo(root: Option<&str>, repo_id: impl Into<String>) -> Self {
        Self::new(root.map(PathBuf::from).unwrap_or_else(user_cache_root), repo_id)
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Short model name, the last path segment of the repository id.
    pub fn model_name(&self) -> &str {
        self.repo_id.rsplit('/').next().unwrap_or(&self.repo_id)
    }

    /// `{root}/{org}_{name}` for the main revision, suffixed otherwise.
    pub fn model_dir(&self) -> PathBuf {
        let mut dir = self.repo_id.replace('/', "_");
        if self.revision != DEFAULT_REVISION {
            dir.push('@');
            dir.push_str(&self.revision);
        }
        self.root.join(dir)
    }

    /// Files not yet present in the cache.
    pub fn missing_files(&self) -> Vec<&'static str> {
        let dir = self.model_dir();
        MODEL_FILES
            .into_iter()
            .filter(|f| !dir.join(f).is_file())
            .collect()
    }

    fn files(&self) -> ModelFiles {
        let dir = self.model_dir();
        ModelFiles {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        }
    }

    /// Download whatever is missing and return the cached paths.
    pub fn fetch(&self) -> Result<ModelFiles, EmbeddingError> {
        let missing = self.missing_files();
        if missing.is_empty() {
            debug!(dir = ?self.model_dir(), "Model files cached");
            return Ok(self.files());
        }

        info!(
            repo = %self.repo_id,
            revision = %self.revision,
            files = ?missing,
            "Downloading model files"
        );
        let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
        let repo = api.repo(Repo::with_revision(
            self.repo_id.clone(),
            RepoType::Model,
            self.revision.clone(),
        ));

        let dir = self.model_dir();
        std::fs::create_dir_all(&dir)?;
        for file in missing {
            let downloaded = repo
                .get(file)
                .map_err(|e| EmbeddingError::Download(format!("{}: {}", file, e)))?;
            std::fs::copy(&downloaded, dir.join(file))?;
            debug!(file, "Cached");
        }

        Ok(self.files())
    }
}
