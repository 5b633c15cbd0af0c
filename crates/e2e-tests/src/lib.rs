//! End-to-end test infrastructure for catalog-ingest.
//!
//! Provides a shared TestHarness: a mocked catalog API (wiremock), an
//! on-disk vector store that records every upsert, and a deterministic
//! encoder, wired into a real [`SweepController`].

use std::ops::Range;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ingest_catalog::{CatalogClient, RetryPolicy};
use ingest_embeddings::{Embedding, EmbeddingError, EmbeddingModel, ModelInfo};
use ingest_pipeline::{SweepConfig, SweepController};
use ingest_types::{CatalogSettings, Distance, FlushFailurePolicy, IndexPoint};
use ingest_vector::{CollectionConfig, LocalStore, VectorError, VectorIndexWriter, VectorStore};

/// Vector size used by the test encoder and collection
pub const TEST_DIM: usize = 8;

/// Collection every scenario writes to
pub const COLLECTION: &str = "movies";

/// List endpoint served by the mock catalog
pub const LIST_PATH: &str = "/movie/top_rated";

/// Deterministic encoder: the vector depends only on the text bytes.
pub struct TestEncoder {
    info: ModelInfo,
}

impl TestEncoder {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "test-encoder".to_string(),
                dimension,
                max_sequence_length: 256,
            },
        }
    }
}

impl EmbeddingModel for TestEncoder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut values = vec![0.0f32; self.info.dimension];
        for (i, byte) in text.bytes().enumerate() {
            values[i % self.info.dimension] += f32::from(byte);
        }
        Ok(Embedding::new(values))
    }
}

/// Local store that remembers the size of every upsert it accepted.
pub struct RecordingStore {
    inner: LocalStore,
    upserts: Mutex<Vec<usize>>,
}

impl RecordingStore {
    pub fn open(root: PathBuf) -> Self {
        Self {
            inner: LocalStore::open(root).expect("Failed to open local store"),
            upserts: Mutex::new(Vec::new()),
        }
    }

    /// Sizes of accepted upserts, in call order.
    pub fn upsert_sizes(&self) -> Vec<usize> {
        self.upserts.lock().expect("upserts lock").clone()
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    fn backend(&self) -> &'static str {
        "recording"
    }

    async fn collection_info(
        &self,
        name: &str,
    ) -> Result<Option<CollectionConfig>, VectorError> {
        self.inner.collection_info(name).await
    }

    async fn create_collection(
        &self,
        name: &str,
        config: &CollectionConfig,
    ) -> Result<(), VectorError> {
        self.inner.create_collection(name, config).await
    }

    async fn upsert(&self, name: &str, points: &[IndexPoint]) -> Result<(), VectorError> {
        self.inner.upsert(name, points).await?;
        self.upserts.lock().expect("upserts lock").push(points.len());
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<usize, VectorError> {
        self.inner.count(name).await
    }

    async fn get_point(&self, name: &str, id: u64) -> Result<Option<IndexPoint>, VectorError> {
        self.inner.get_point(name, id).await
    }
}

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Mock catalog API
    pub catalog: MockServer,
    /// Vector store the sweep writes to
    pub store: Arc<RecordingStore>,
    /// Checkpoint file location
    pub checkpoint_path: PathBuf,
}

impl TestHarness {
    /// Start a mock catalog and open an empty local vector store.
    pub async fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(RecordingStore::open(temp_dir.path().join("vectors")));
        let checkpoint_path = temp_dir.path().join("sweep-checkpoint.json");

        Self {
            _temp_dir: temp_dir,
            catalog: MockServer::start().await,
            store,
            checkpoint_path,
        }
    }

    /// Catalog client pointed at the mock, with millisecond retry delays.
    pub fn catalog_client(&self) -> CatalogClient {
        let settings = CatalogSettings {
            base_url: self.catalog.uri(),
            api_key: Some("e2e-key".into()),
            timeout_secs: 5,
            ..Default::default()
        };
        CatalogClient::from_settings(&settings, RetryPolicy::fast(5))
            .expect("Failed to build catalog client")
    }

    /// Sweep config for pages `1..=end_page` with no pacing delay.
    pub fn sweep_config(&self, end_page: u32, batch_size: usize) -> SweepConfig {
        SweepConfig {
            collection: COLLECTION.to_string(),
            vector_size: TEST_DIM,
            distance: Distance::Cosine,
            start_page: 1,
            end_page,
            batch_size,
            page_delay: Duration::ZERO,
            flush_failure: FlushFailurePolicy::Drop,
            max_flush_retries: 3,
            respect_total_pages: true,
            checkpoint_path: None,
            resume: false,
        }
    }

    /// Controller wired to the mock catalog, test encoder and store.
    pub fn controller(&self, config: SweepConfig) -> SweepController {
        SweepController::new(
            Arc::new(self.catalog_client()),
            Arc::new(TestEncoder::new(TEST_DIM)),
            VectorIndexWriter::new(self.store.clone()),
            config,
        )
    }

    /// Serve `results` for list page `page`.
    pub async fn mount_page(&self, page: u32, results: Vec<Value>, total_pages: Option<u32>) {
        let mut body = json!({ "page": page, "results": results });
        if let Some(total) = total_pages {
            body["total_pages"] = json!(total);
        }
        Mock::given(method("GET"))
            .and(path(LIST_PATH))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.catalog)
            .await;
    }

    /// Answer every request for list page `page` with `status`.
    pub async fn mount_status(&self, page: u32, status: u16) {
        Mock::given(method("GET"))
            .and(path(LIST_PATH))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.catalog)
            .await;
    }

    /// Number of requests the mock catalog received for list page `page`.
    pub async fn requests_for_page(&self, page: u32) -> usize {
        let wanted = page.to_string();
        self.catalog
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == LIST_PATH)
            .filter(|r| r.url.query_pairs().any(|(k, v)| k == "page" && v == wanted))
            .count()
    }
}

/// A catalog entry as the list endpoint returns it.
pub fn movie(id: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Movie {}", id),
        "overview": format!("Synopsis of movie number {}.", id),
        "poster_path": format!("/poster-{}.jpg", id),
        "release_date": "1999-03-31",
        "popularity": 10.5,
        "vote_average": 7.9,
        "vote_count": 1200
    })
}

/// Catalog entries for every id in `ids`.
pub fn movies(ids: Range<u64>) -> Vec<Value> {
    ids.map(movie).collect()
}
