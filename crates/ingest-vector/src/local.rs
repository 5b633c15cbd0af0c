//! Local vector store.
//!
//! Each collection lives in its own directory under the store root:
//!
//! ```text
//! <root>/<collection>/collection.json   vector size and distance
//! <root>/<collection>/hnsw.usearch      HNSW index
//! <root>/<collection>/points/           RocksDB: id -> vector + payload
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use ingest_types::IndexPoint;

use crate::error::VectorError;
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::points::PointStore;
use crate::store::{CollectionConfig, VectorStore};

const COLLECTION_FILE: &str = "collection.json";
const POINTS_DIR: &str = "points";

struct LocalCollection {
    config: CollectionConfig,
    index: RwLock<HnswIndex>,
    points: PointStore,
}

impl LocalCollection {
    fn open(dir: &Path, config: CollectionConfig) -> Result<Self, VectorError> {
        let index = HnswIndex::open_or_create(HnswConfig::new(
            config.vector_size,
            config.distance,
            dir,
        ))?;
        let points = PointStore::open(dir.join(POINTS_DIR))?;
        Ok(Self {
            config,
            index: RwLock::new(index),
            points,
        })
    }
}

/// Vector store keeping collections on the local filesystem.
pub struct LocalStore {
    root: PathBuf,
    open: Mutex<HashMap<String, Arc<LocalCollection>>>,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, VectorError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!(path = ?root, "Opened local vector store");
        Ok(Self {
            root,
            open: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_config(&self, name: &str) -> Result<Option<CollectionConfig>, VectorError> {
        let path = self.collection_dir(name).join(COLLECTION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn collection(&self, name: &str) -> Result<Arc<LocalCollection>, VectorError> {
        let mut open = self
            .open
            .lock()
            .map_err(|e| VectorError::Index(format!("Lock poisoned: {}", e)))?;

        if let Some(collection) = open.get(name) {
            return Ok(Arc::clone(collection));
        }

        let config = self
            .read_config(name)?
            .ok_or_else(|| VectorError::CollectionNotFound(name.to_string()))?;
        let collection = Arc::new(LocalCollection::open(&self.collection_dir(name), config)?);
        open.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }
}

#[async_trait]
impl VectorStore for LocalStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn collection_info(
        &self,
        name: &str,
    ) -> Result<Option<CollectionConfig>, VectorError> {
        self.read_config(name)
    }

    async fn create_collection(
        &self,
        name: &str,
        config: &CollectionConfig,
    ) -> Result<(), VectorError> {
        let dir = self.collection_dir(name);
        std::fs::create_dir_all(&dir)?;

        // Write the config last so a half-created collection reads as absent.
        let collection = LocalCollection::open(&dir, *config)?;
        let tmp = dir.join(format!("{}.tmp", COLLECTION_FILE));
        std::fs::write(&tmp, serde_json::to_vec_pretty(config)?)?;
        std::fs::rename(&tmp, dir.join(COLLECTION_FILE))?;

        self.open
            .lock()
            .map_err(|e| VectorError::Index(format!("Lock poisoned: {}", e)))?
            .insert(name.to_string(), Arc::new(collection));

        info!(collection = name, %config, "Created local collection");
        Ok(())
    }

    async fn upsert(&self, name: &str, points: &[IndexPoint]) -> Result<(), VectorError> {
        let collection = self.collection(name)?;

        // Reject the whole batch before touching storage.
        if let Some(bad) = points
            .iter()
            .find(|p| p.dimension() != collection.config.vector_size)
        {
            return Err(VectorError::DimensionMismatch {
                expected: collection.config.vector_size,
                actual: bad.dimension(),
            });
        }

        let mut index = collection
            .index
            .write()
            .map_err(|e| VectorError::Index(format!("Lock poisoned: {}", e)))?;

        for point in points {
            index.upsert(point.id, &point.vector)?;
            collection.points.put(point)?;
        }
        index.save()?;

        debug!(collection = name, points = points.len(), "Upserted points");
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<usize, VectorError> {
        self.collection(name)?.points.count()
    }

    async fn get_point(&self, name: &str, id: u64) -> Result<Option<IndexPoint>, VectorError> {
        self.collection(name)?.points.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_types::{Distance, Payload};
    use tempfile::TempDir;

    fn point(id: u64, title: &str, dim: usize) -> IndexPoint {
        let mut payload = Payload::new();
        payload.insert("title".into(), title.into());
        let vector = (0..dim).map(|i| (i as f32 + id as f32) / dim as f32).collect();
        IndexPoint::new(id, vector, payload)
    }

    #[tokio::test]
    async fn test_create_and_describe_collection() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();

        assert!(store.collection_info("movies").await.unwrap().is_none());

        let config = CollectionConfig::new(8, Distance::Cosine);
        store.create_collection("movies", &config).await.unwrap();

        assert_eq!(store.collection_info("movies").await.unwrap(), Some(config));
        assert_eq!(store.count("movies").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_id() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        store
            .create_collection("movies", &CollectionConfig::new(8, Distance::Cosine))
            .await
            .unwrap();

        let batch = vec![point(1, "Alien", 8), point(2, "Aliens", 8)];
        store.upsert("movies", &batch).await.unwrap();
        store.upsert("movies", &batch).await.unwrap();
        let mut replacement = point(2, "Aliens (Special Edition)", 8);
        replacement.vector = vec![0.5; 8];
        store
            .upsert("movies", std::slice::from_ref(&replacement))
            .await
            .unwrap();

        assert_eq!(store.count("movies").await.unwrap(), 2);
        let stored = store.get_point("movies", 2).await.unwrap().unwrap();
        assert_eq!(stored.payload["title"], "Aliens (Special Edition)");
        assert_eq!(stored.vector, vec![0.5; 8]);
        assert_ne!(stored.vector, batch[1].vector);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_dimension() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        store
            .create_collection("movies", &CollectionConfig::new(8, Distance::Cosine))
            .await
            .unwrap();

        let result = store
            .upsert("movies", &[point(1, "ok", 8), point(2, "short", 4)])
            .await;
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
        assert_eq!(store.count("movies").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_unknown_collection() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();

        let result = store.upsert("missing", &[point(1, "x", 8)]).await;
        assert!(matches!(result, Err(VectorError::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_reopen_keeps_points() {
        let temp = TempDir::new().unwrap();
        {
            let store = LocalStore::open(temp.path()).unwrap();
            store
                .create_collection("movies", &CollectionConfig::new(8, Distance::Dot))
                .await
                .unwrap();
            store
                .upsert("movies", &[point(7, "Se7en", 8)])
                .await
                .unwrap();
        }

        let store = LocalStore::open(temp.path()).unwrap();
        assert_eq!(
            store.collection_info("movies").await.unwrap(),
            Some(CollectionConfig::new(8, Distance::Dot))
        );
        assert_eq!(store.count("movies").await.unwrap(), 1);
        assert!(store.get_point("movies", 7).await.unwrap().is_some());
    }
}
