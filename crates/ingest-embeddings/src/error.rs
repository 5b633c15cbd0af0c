//! Embedding error types.

use thiserror::Error;

/// Errors that can occur while loading a model or encoding text.
///
/// Encoding failures are scoped to a single record: the sweep skips the
/// record and keeps going.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Candle model error
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Tokenizer error
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model file not found or unreadable
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Download error
    #[error("Failed to download model: {0}")]
    Download(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Text that cannot be encoded (empty, or rejected by the tokenizer)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encoder produced a vector of the wrong size
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
