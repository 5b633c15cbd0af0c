//! Error types for the sweep pipeline.

use ingest_embeddings::EmbeddingError;
use ingest_vector::{IndexProvisionError, VectorError};
use thiserror::Error;

/// Errors that stop a sweep before or outside page processing.
///
/// Page and batch failures never surface here; the sweep records them in
/// its report and keeps going.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Target collection could not be provisioned
    #[error(transparent)]
    Provision(#[from] IndexProvisionError),

    /// Encoder output size differs from the collection's vector size
    #[error("Encoder produces {encoder}-dimensional vectors but collection expects {collection}")]
    DimensionMismatch { encoder: usize, collection: usize },

    /// Embedding model error
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector store error outside a batch write
    #[error("Vector error: {0}")]
    Vector(#[from] VectorError),

    /// Checkpoint load/save issues
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid sweep configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Checkpoint(err.to_string())
    }
}
