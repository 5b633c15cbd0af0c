//! Remote vector store speaking the Qdrant REST protocol.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ingest_types::{Distance, IndexPoint, Payload};

use crate::error::VectorError;
use crate::store::{CollectionConfig, VectorStore};

/// Vector store backed by a remote Qdrant service.
pub struct QdrantStore {
    client: Client,
    base_url: String,
}

impl QdrantStore {
    /// Build a client for `url`, sending `api_key` as the `api-key` header when set.
    pub fn new(
        url: &str,
        api_key: Option<&SecretString>,
        timeout: Duration,
    ) -> Result<Self, VectorError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(VectorError::Config(format!(
                "vector service url must be http(s): {}",
                url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key.expose_secret().trim())
                .map_err(|_| VectorError::Config("invalid vector service api key".to_string()))?;
            value.set_sensitive(true);
            headers.insert("api-key", value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| VectorError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{}", self.base_url, name)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    config: CollectionInfoConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionInfoConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Debug, Serialize, Deserialize)]
struct VectorParams {
    size: usize,
    distance: Distance,
}

#[derive(Debug, Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct UpsertPoints<'a> {
    points: Vec<WirePoint<'a>>,
}

#[derive(Debug, Serialize)]
struct WirePoint<'a> {
    id: u64,
    vector: &'a [f32],
    payload: &'a Payload,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct StoredPoint {
    id: u64,
    #[serde(default)]
    vector: Option<Vec<f32>>,
    #[serde(default)]
    payload: Option<Payload>,
}

fn transport(err: reqwest::Error) -> VectorError {
    VectorError::Transport(err.to_string())
}

/// Read a success body; a body of the wrong shape is a `Serialization` error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, VectorError> {
    let bytes = check(response).await?.bytes().await.map_err(transport)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Turn a non-success response into a `Service` error.
async fn check(response: Response) -> Result<Response, VectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(VectorError::Service {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn collection_info(
        &self,
        name: &str,
    ) -> Result<Option<CollectionConfig>, VectorError> {
        let response = self
            .client
            .get(self.collection_url(name))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let info: Envelope<CollectionInfo> = decode(response).await?;
        let vectors = info.result.config.params.vectors;
        Ok(Some(CollectionConfig::new(vectors.size, vectors.distance)))
    }

    async fn create_collection(
        &self,
        name: &str,
        config: &CollectionConfig,
    ) -> Result<(), VectorError> {
        let body = CreateCollection {
            vectors: VectorParams {
                size: config.vector_size,
                distance: config.distance,
            },
        };
        let response = self
            .client
            .put(self.collection_url(name))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;

        debug!(collection = name, %config, "Created collection");
        Ok(())
    }

    async fn upsert(&self, name: &str, points: &[IndexPoint]) -> Result<(), VectorError> {
        let body = UpsertPoints {
            points: points
                .iter()
                .map(|p| WirePoint {
                    id: p.id,
                    vector: &p.vector,
                    payload: &p.payload,
                })
                .collect(),
        };
        let response = self
            .client
            .put(format!("{}/points", self.collection_url(name)))
            .query(&[("wait", "true")])
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<usize, VectorError> {
        let response = self
            .client
            .post(format!("{}/points/count", self.collection_url(name)))
            .json(&serde_json::json!({ "exact": true }))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(VectorError::CollectionNotFound(name.to_string()));
        }

        let count: Envelope<CountResult> = decode(response).await?;
        Ok(count.result.count)
    }

    async fn get_point(&self, name: &str, id: u64) -> Result<Option<IndexPoint>, VectorError> {
        let response = self
            .client
            .get(format!("{}/points/{}", self.collection_url(name), id))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let point: Envelope<StoredPoint> = decode(response).await?;
        let point = point.result;
        Ok(Some(IndexPoint::new(
            point.id,
            point.vector.unwrap_or_default(),
            point.payload.unwrap_or_default(),
        )))
    }
}
