//! # ingest-types
//!
//! Shared domain types for the catalog ingestion pipeline.
//!
//! This crate defines the core data structures used throughout the system:
//! - Catalog records: items decoded from the external catalog API
//! - Index points: `(id, vector, payload)` triples written to the vector store
//! - Distance metrics for vector collections
//! - Settings: layered configuration types
//!
//! ## Usage
//!
//! ```rust
//! use ingest_types::{CatalogRecord, Distance};
//!
//! let record = CatalogRecord::new(278, "The Shawshank Redemption")
//!     .with_overview("Two imprisoned men bond over a number of years.");
//! assert_eq!(record.title(), "The Shawshank Redemption");
//! assert_eq!(Distance::default(), Distance::Cosine);
//! ```

pub mod config;
pub mod error;
pub mod point;
pub mod record;

pub use config::{
    non_blank, CatalogSettings, EmbeddingSettings, FlushFailurePolicy, RetrySettings, Settings,
    SweepSettings, VectorSettings,
};
pub use error::IngestError;
pub use point::{Distance, IndexPoint, Payload};
pub use record::CatalogRecord;
