//! Approximate nearest-neighbour index for one local collection (usearch).
//!
//! Graph parameters: M = 16, ef_construction = 200, ef_search = 100.

use std::path::PathBuf;

use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use ingest_types::Distance;

use crate::error::VectorError;

/// File name of the serialized index inside a collection directory
pub const INDEX_FILE: &str = "hnsw.usearch";

/// Shape and tuning of one collection's index
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Vector dimension
    pub dimension: usize,
    /// Distance metric
    pub distance: Distance,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Directory holding the index file
    pub index_path: PathBuf,
    /// Initial capacity; the index grows past it on demand
    pub capacity: usize,
}

impl HnswConfig {
    pub fn new(dimension: usize, distance: Distance, index_path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            distance,
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            index_path: index_path.into(),
            capacity: 1_024,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: metric_kind(self.distance),
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false, // one vector per key
        }
    }
}

fn metric_kind(distance: Distance) -> MetricKind {
    match distance {
        Distance::Cosine => MetricKind::Cos,
        Distance::Euclid => MetricKind::L2sq,
        Distance::Dot => MetricKind::IP,
    }
}

/// HNSW index wrapper around usearch, keyed by point id.
pub struct HnswIndex {
    index: Index,
    config: HnswConfig,
}

impl HnswIndex {
    /// Create a new HNSW index or open an existing one.
    pub fn open_or_create(config: HnswConfig) -> Result<Self, VectorError> {
        let index_file = config.index_path.join(INDEX_FILE);
        let index = Index::new(&config.options()).map_err(|e| VectorError::Index(e.to_string()))?;

        if index_file.exists() {
            info!(path = ?index_file, "Opening existing vector index");
            index
                .load(path_str(&index_file)?)
                .map_err(|e| VectorError::Index(format!("Failed to load: {}", e)))?;
        } else {
            info!(path = ?index_file, dim = config.dimension, "Creating new vector index");
            std::fs::create_dir_all(&config.index_path)?;
            index
                .reserve(config.capacity)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        Ok(Self { index, config })
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: u64) -> bool {
        self.index.contains(id)
    }

    /// Insert a vector, replacing any vector already stored under `id`.
    pub fn upsert(&mut self, id: u64, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }

        if self.index.contains(id) {
            self.index
                .remove(id)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        let needed = self.index.size() + 1;
        if needed > self.index.capacity() {
            let grown = (self.index.capacity() * 2).max(needed);
            self.index
                .reserve(grown)
                .map_err(|e| VectorError::Index(e.to_string()))?;
            debug!(capacity = grown, "Grew vector index");
        }

        self.index
            .add(id, vector)
            .map_err(|e| VectorError::Index(e.to_string()))?;
        Ok(())
    }

    /// Save index to disk
    pub fn save(&self) -> Result<(), VectorError> {
        let path = self.config.index_path.join(INDEX_FILE);
        self.index
            .save(path_str(&path)?)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;

        debug!(path = ?path, vectors = self.index.size(), "Saved vector index");
        Ok(())
    }
}

fn path_str(path: &std::path::Path) -> Result<&str, VectorError> {
    path.to_str()
        .ok_or_else(|| VectorError::Index("Invalid path encoding".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn random_vector(dim: usize) -> Vec<f32> {
        use rand::Rng;
        let mut rng = rand::rng();
        (0..dim).map(|_| rng.random()).collect()
    }

    #[test]
    fn test_create_index() {
        let temp = TempDir::new().unwrap();
        let index =
            HnswIndex::open_or_create(HnswConfig::new(384, Distance::Cosine, temp.path())).unwrap();
        assert_eq!(index.dimension(), 384);
        assert!(index.is_empty());
    }

    #[test]
    fn test_upsert_replaces_existing_key() {
        let temp = TempDir::new().unwrap();
        let config = HnswConfig::new(16, Distance::Cosine, temp.path()).with_capacity(4);
        let mut index = HnswIndex::open_or_create(config).unwrap();

        index.upsert(42, &random_vector(16)).unwrap();
        index.upsert(42, &random_vector(16)).unwrap();

        assert!(index.contains(42));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let temp = TempDir::new().unwrap();
        let config = HnswConfig::new(8, Distance::Euclid, temp.path()).with_capacity(2);
        let mut index = HnswIndex::open_or_create(config).unwrap();

        for id in 0..10 {
            index.upsert(id, &random_vector(8)).unwrap();
        }
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let config = HnswConfig::new(16, Distance::Cosine, temp.path()).with_capacity(16);

        {
            let mut index = HnswIndex::open_or_create(config.clone()).unwrap();
            for id in 0..5 {
                index.upsert(id, &random_vector(16)).unwrap();
            }
            index.save().unwrap();
        }

        let index = HnswIndex::open_or_create(config).unwrap();
        assert_eq!(index.len(), 5);
        assert!(index.contains(3));
    }

    #[test]
    fn test_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        let mut index =
            HnswIndex::open_or_create(HnswConfig::new(16, Distance::Cosine, temp.path())).unwrap();

        let result = index.upsert(0, &random_vector(8));
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch {
                expected: 16,
                actual: 8
            })
        ));
    }
}
