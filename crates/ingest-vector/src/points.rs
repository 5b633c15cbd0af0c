//! Point storage for the local vector store.
//!
//! Maps point ids to their vector and payload. Stored in RocksDB so that
//! payloads survive restarts and overwrites are atomic per key.

use std::path::Path;

use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};
use serde::{Deserialize, Serialize};
use tracing::info;

use ingest_types::{IndexPoint, Payload};

use crate::error::VectorError;

/// Column family name for stored points
pub const CF_POINTS: &str = "points";

/// Value stored per point id
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: Payload,
}

/// Point storage using RocksDB.
pub struct PointStore {
    db: DB,
}

impl PointStore {
    /// Open or create point storage.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VectorError> {
        let path = path.as_ref();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_POINTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        info!(path = ?path, "Opened point storage");
        Ok(Self { db })
    }

    fn cf(&self) -> Result<&ColumnFamily, VectorError> {
        self.db
            .cf_handle(CF_POINTS)
            .ok_or_else(|| VectorError::Index(format!("column family {} missing", CF_POINTS)))
    }

    /// Store a point, replacing any previous value for its id.
    pub fn put(&self, point: &IndexPoint) -> Result<(), VectorError> {
        let value = serde_json::to_vec(&StoredPoint {
            vector: point.vector.clone(),
            payload: point.payload.clone(),
        })?;
        self.db.put_cf(self.cf()?, point.id.to_be_bytes(), value)?;
        Ok(())
    }

    /// Get a point by id.
    pub fn get(&self, id: u64) -> Result<Option<IndexPoint>, VectorError> {
        match self.db.get_cf(self.cf()?, id.to_be_bytes())? {
            Some(bytes) => {
                let stored: StoredPoint = serde_json::from_slice(&bytes)?;
                Ok(Some(IndexPoint::new(id, stored.vector, stored.payload)))
            }
            None => Ok(None),
        }
    }

    /// Count stored points
    pub fn count(&self) -> Result<usize, VectorError> {
        let mut count = 0;
        for item in self.db.iterator_cf(self.cf()?, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn point(id: u64, title: &str, value: f32) -> IndexPoint {
        let mut payload = Payload::new();
        payload.insert("title".into(), title.into());
        IndexPoint::new(id, vec![value; 4], payload)
    }

    #[test]
    fn test_put_and_get() {
        let temp = TempDir::new().unwrap();
        let store = PointStore::open(temp.path()).unwrap();

        store.put(&point(550, "Fight Club", 0.5)).unwrap();

        let retrieved = store.get(550).unwrap().unwrap();
        assert_eq!(retrieved.id, 550);
        assert_eq!(retrieved.vector, vec![0.5; 4]);
        assert_eq!(retrieved.payload["title"], "Fight Club");
        assert!(store.get(551).unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = PointStore::open(temp.path()).unwrap();

        store.put(&point(1, "first", 0.1)).unwrap();
        store.put(&point(1, "second", 0.2)).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let retrieved = store.get(1).unwrap().unwrap();
        assert_eq!(retrieved.payload["title"], "second");
        assert_eq!(retrieved.vector, vec![0.2; 4]);
    }

    #[test]
    fn test_count() {
        let temp = TempDir::new().unwrap();
        let store = PointStore::open(temp.path()).unwrap();
        assert_eq!(store.count().unwrap(), 0);

        for id in 0..5 {
            store.put(&point(id, "t", 1.0)).unwrap();
        }
        assert_eq!(store.count().unwrap(), 5);
    }
}
