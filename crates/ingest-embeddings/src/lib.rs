//! # ingest-embeddings
//!
//! Turns normalized catalog text into fixed-size semantic vectors.
//!
//! ## Features
//! - [`EmbeddingModel`] trait: one text in, one fixed-length vector out
//! - Local inference via Candle with all-MiniLM-L6-v2 (384 dimensions)
//! - Model files downloaded once from HuggingFace Hub and cached on disk
//!
//! The encoder is deterministic for a given model and input text, which is
//! what makes re-ingesting a catalog reproducible.

pub mod cache;
pub mod candle;
pub mod error;
pub mod model;

pub use crate::candle::{CandleEncoder, EMBEDDING_DIM, MAX_SEQ_LENGTH};
pub use cache::{ModelCache, ModelFiles, DEFAULT_MODEL_REPO, DEFAULT_REVISION, MODEL_FILES};
pub use error::EmbeddingError;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
