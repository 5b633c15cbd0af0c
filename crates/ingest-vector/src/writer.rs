//! Collection provisioning and batch upserts.
//!
//! [`VectorIndexWriter`] is the only component that talks to the vector
//! store during a sweep. It makes sure the target collection exists with the
//! expected vector size and metric, then writes batches of points into it.

use std::sync::Arc;

use tracing::{debug, info};

use ingest_types::{Distance, IndexPoint};

use crate::error::{IndexProvisionError, IndexWriteError};
use crate::store::{CollectionConfig, VectorStore};

/// What `ensure_collection` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The collection was created
    Created,
    /// A compatible collection already existed and was left untouched
    Existing,
}

/// Writes points into a collection of a [`VectorStore`].
#[derive(Clone)]
pub struct VectorIndexWriter {
    store: Arc<dyn VectorStore>,
}

impl VectorIndexWriter {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Make sure `collection` exists with the given vector size and distance.
    ///
    /// Creates it when absent. An existing collection with different
    /// parameters is an error and is never modified.
    pub async fn ensure_collection(
        &self,
        collection: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<ProvisionOutcome, IndexProvisionError> {
        let expected = CollectionConfig::new(vector_size, distance);
        let store_err = |source| IndexProvisionError::Store {
            collection: collection.to_string(),
            source,
        };

        match self
            .store
            .collection_info(collection)
            .await
            .map_err(store_err)?
        {
            Some(found) if found == expected => {
                debug!(collection, %found, "Collection already exists");
                Ok(ProvisionOutcome::Existing)
            }
            Some(found) => Err(IndexProvisionError::Incompatible {
                collection: collection.to_string(),
                expected,
                found,
            }),
            None => {
                self.store
                    .create_collection(collection, &expected)
                    .await
                    .map_err(store_err)?;
                info!(
                    collection,
                    backend = self.store.backend(),
                    %expected,
                    "Created collection"
                );
                Ok(ProvisionOutcome::Created)
            }
        }
    }

    /// Insert or replace `points` in `collection`.
    ///
    /// An empty slice performs no write.
    pub async fn upsert(
        &self,
        collection: &str,
        points: &[IndexPoint],
    ) -> Result<(), IndexWriteError> {
        if points.is_empty() {
            return Ok(());
        }

        self.store
            .upsert(collection, points)
            .await
            .map_err(|source| IndexWriteError {
                collection: collection.to_string(),
                points: points.len(),
                source,
            })?;

        debug!(collection, points = points.len(), "Upserted batch");
        Ok(())
    }

    /// Number of points currently stored in `collection`.
    pub async fn count(&self, collection: &str) -> Result<usize, crate::VectorError> {
        self.store.count(collection).await
    }
}
