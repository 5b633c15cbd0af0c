//! Vector store trait and types.
//!
//! A store holds named collections of `(id, vector, payload)` points. Two
//! backends implement it: [`crate::QdrantStore`] talks to a remote vector
//! service, [`crate::LocalStore`] keeps collections in a directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ingest_types::{Distance, IndexPoint};

use crate::error::VectorError;

/// Vector parameters a collection is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Vector dimension
    pub vector_size: usize,
    /// Distance metric
    pub distance: Distance,
}

impl CollectionConfig {
    pub fn new(vector_size: usize, distance: Distance) -> Self {
        Self {
            vector_size,
            distance,
        }
    }
}

impl std::fmt::Display for CollectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "size={} distance={}", self.vector_size, self.distance)
    }
}

/// Trait for vector stores.
///
/// `upsert` must be idempotent by point id: writing an id that already
/// exists replaces its vector and payload and never adds a second point.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logging
    fn backend(&self) -> &'static str;

    /// Configuration of an existing collection, `None` if it does not exist.
    async fn collection_info(&self, name: &str)
        -> Result<Option<CollectionConfig>, VectorError>;

    /// Check whether a collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool, VectorError> {
        Ok(self.collection_info(name).await?.is_some())
    }

    /// Create a collection. Callers check existence first.
    async fn create_collection(
        &self,
        name: &str,
        config: &CollectionConfig,
    ) -> Result<(), VectorError>;

    /// Insert or replace points by id.
    async fn upsert(&self, name: &str, points: &[IndexPoint]) -> Result<(), VectorError>;

    /// Number of points in a collection.
    async fn count(&self, name: &str) -> Result<usize, VectorError>;

    /// Fetch a stored point by id.
    async fn get_point(&self, name: &str, id: u64) -> Result<Option<IndexPoint>, VectorError>;
}
