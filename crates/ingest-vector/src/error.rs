//! Vector store error types.

use thiserror::Error;

use crate::store::CollectionConfig;

/// Low-level errors raised by a vector store backend.
#[derive(Debug, Error)]
pub enum VectorError {
    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    /// Vector has the wrong number of values for the collection
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Request never reached the service or the response was cut off
    #[error("Transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("Vector service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// RocksDB error
    #[error("Database error: {0}")]
    Database(#[from] rocksdb::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Serialization(err.to_string())
    }
}

/// The target collection could not be made ready for writing.
///
/// Fatal to a sweep: writing into a collection whose vector size or metric
/// differs from the encoder's would corrupt it.
#[derive(Debug, Error)]
pub enum IndexProvisionError {
    /// Collection exists with a different vector size or distance metric
    #[error("Collection '{collection}' exists with incompatible config: expected {expected}, found {found}")]
    Incompatible {
        collection: String,
        expected: CollectionConfig,
        found: CollectionConfig,
    },

    /// Existence check or creation failed
    #[error("Failed to provision collection '{collection}': {source}")]
    Store {
        collection: String,
        #[source]
        source: VectorError,
    },
}

/// A batch upsert was rejected or could not be delivered.
#[derive(Debug, Error)]
#[error("Failed to upsert {points} points into '{collection}': {source}")]
pub struct IndexWriteError {
    pub collection: String,
    pub points: usize,
    #[source]
    pub source: VectorError,
}
