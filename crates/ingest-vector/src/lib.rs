//! # ingest-vector
//!
//! Vector index writer for catalog ingestion.
//!
//! Points are written through the [`VectorStore`] trait, which has two
//! backends:
//! - [`QdrantStore`]: a remote vector service over its REST API
//! - [`LocalStore`]: usearch HNSW index plus RocksDB point storage on disk
//!
//! [`VectorIndexWriter`] provisions the target collection and performs batch
//! upserts keyed by catalog id, so replaying a batch never duplicates points.

pub mod error;
pub mod hnsw;
pub mod local;
pub mod points;
pub mod qdrant;
pub mod store;
pub mod writer;

pub use error::{IndexProvisionError, IndexWriteError, VectorError};
pub use hnsw::{HnswConfig, HnswIndex};
pub use local::LocalStore;
pub use points::PointStore;
pub use qdrant::QdrantStore;
pub use store::{CollectionConfig, VectorStore};
pub use writer::{ProvisionOutcome, VectorIndexWriter};
