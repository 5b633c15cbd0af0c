//! Typed client for the catalog API.
//!
//! Wraps a [`FetchClient`] and decodes the list, search and related
//! endpoints into [`CatalogRecord`]s. Records are decoded one by one: a
//! malformed entry is counted and skipped instead of failing its page.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use ingest_types::{non_blank, CatalogRecord, CatalogSettings};

use crate::error::{CatalogError, FetchError};
use crate::fetch::FetchClient;
use crate::retry::RetryPolicy;

/// Search endpoint used for name-to-id resolution
pub const SEARCH_PATH: &str = "/search/movie";

/// One decoded page of catalog results.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    /// Page number the catalog reported (the requested one if absent)
    pub page: u32,
    /// Records that decoded, in API order
    pub records: Vec<CatalogRecord>,
    /// Entries that failed to decode
    pub malformed: usize,
    /// Total pages the catalog claims to have
    pub total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    page: Option<u32>,
    results: Vec<serde_json::Value>,
    #[serde(default)]
    total_pages: Option<u32>,
}

impl RawPage {
    fn decode(self, requested: u32) -> CatalogPage {
        let mut records = Vec::with_capacity(self.results.len());
        let mut malformed = 0;
        for value in self.results {
            match serde_json::from_value::<CatalogRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(page = requested, error = %e, "Skipping malformed record");
                    malformed += 1;
                }
            }
        }
        CatalogPage {
            page: self.page.unwrap_or(requested),
            records,
            malformed,
            total_pages: self.total_pages,
        }
    }
}

/// Source of paginated catalog records.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one page of the list being swept.
    async fn fetch_page(&self, page: u32) -> Result<CatalogPage, FetchError>;
}

/// Client for the catalog's list, search and related endpoints.
pub struct CatalogClient {
    fetch: FetchClient,
    list_path: String,
    language: String,
    sort_by: Option<String>,
}

impl CatalogClient {
    pub fn new(fetch: FetchClient, settings: &CatalogSettings) -> Self {
        Self {
            fetch,
            list_path: settings.list_path.clone(),
            language: settings.language.clone(),
            sort_by: settings.sort_by.clone(),
        }
    }

    /// Build the HTTP client and catalog client from settings.
    ///
    /// At least one credential (API key or read access token) is required.
    pub fn from_settings(
        settings: &CatalogSettings,
        policy: RetryPolicy,
    ) -> Result<Self, CatalogError> {
        let api_key = non_blank(settings.api_key.as_ref());
        let token = non_blank(settings.read_access_token.as_ref());
        if api_key.is_none() && token.is_none() {
            return Err(CatalogError::Config(
                "catalog api_key or read_access_token must be set".to_string(),
            ));
        }

        let mut builder = FetchClient::builder(settings.base_url.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .retry_policy(policy);
        if let Some(key) = api_key {
            builder = builder.api_key(SecretString::from(key.expose_secret().trim()));
        }
        if let Some(token) = token {
            builder = builder.bearer_token(SecretString::from(token.expose_secret().trim()));
        }

        Ok(Self::new(builder.build()?, settings))
    }

    /// Path of the list endpoint being swept.
    pub fn list_path(&self) -> &str {
        &self.list_path
    }

    /// Search the catalog by free text. Returns the first results page.
    pub async fn search(&self, query: &str) -> Result<CatalogPage, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FetchError::InvalidRequest(
                "search query must not be empty".to_string(),
            ));
        }

        let params = [
            ("query", query.to_string()),
            ("language", self.language.clone()),
            ("page", "1".to_string()),
        ];
        let raw: RawPage = self.fetch.fetch_json(SEARCH_PATH, &params).await?;
        Ok(raw.decode(1))
    }

    /// Resolve a name to a catalog id: the first search result, if any.
    pub async fn resolve_id(&self, name: &str) -> Result<Option<u64>, FetchError> {
        Ok(self.search(name).await?.records.first().map(|r| r.id))
    }

    /// Items the catalog recommends for `id`.
    pub async fn related(&self, id: u64) -> Result<Vec<CatalogRecord>, FetchError> {
        let path = format!("/movie/{}/recommendations", id);
        let params = [("language", self.language.clone()), ("page", "1".to_string())];
        let raw: RawPage = self.fetch.fetch_json(&path, &params).await?;
        Ok(raw.decode(1).records)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_page(&self, page: u32) -> Result<CatalogPage, FetchError> {
        let mut params = vec![
            ("language", self.language.clone()),
            ("page", page.to_string()),
        ];
        if let Some(sort_by) = &self.sort_by {
            params.push(("sort_by", sort_by.clone()));
        }

        let raw: RawPage = self.fetch.fetch_json(&self.list_path, &params).await?;
        let decoded = raw.decode(page);
        debug!(
            page,
            records = decoded.records.len(),
            malformed = decoded.malformed,
            "Fetched page"
        );
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> CatalogSettings {
        CatalogSettings {
            base_url: server.uri(),
            api_key: Some("test-key".into()),
            ..Default::default()
        }
    }

    fn client(server: &MockServer) -> CatalogClient {
        CatalogClient::from_settings(&settings(server), RetryPolicy::fast(5)).unwrap()
    }

    #[test]
    fn test_requires_credential() {
        let settings = CatalogSettings {
            api_key: Some("  ".into()),
            ..Default::default()
        };
        let result = CatalogClient::from_settings(&settings, RetryPolicy::default());
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_page_decodes_and_counts_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/top_rated"))
            .and(query_param("page", "3"))
            .and(query_param("language", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 3,
                "total_pages": 42,
                "results": [
                    {"id": 238, "title": "The Godfather", "overview": "Spanning the years 1945 to 1955."},
                    {"title": "missing id"},
                    {"id": "not-a-number"},
                    {"id": 424, "title": "Schindler's List", "overview": null}
                ]
            })))
            .mount(&server)
            .await;

        let page = client(&server).fetch_page(3).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, Some(42));
        assert_eq!(page.malformed, 2);
        let ids: Vec<u64> = page.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![238, 424]);
    }

    #[tokio::test]
    async fn test_fetch_page_wrong_shape_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/top_rated"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": 1})))
            .mount(&server)
            .await;

        let err = client(&server).fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_sort_by_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("sort_by", "popularity.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;

        let settings = CatalogSettings {
            list_path: "/discover/movie".to_string(),
            sort_by: Some("popularity.desc".to_string()),
            ..settings(&server)
        };
        let client = CatalogClient::from_settings(&settings, RetryPolicy::fast(1)).unwrap();
        let page = client.fetch_page(7).await.unwrap();
        assert_eq!(page.page, 7);
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_id_and_related() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "Inception"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "results": [
                    {"id": 27205, "title": "Inception"},
                    {"id": 64956, "title": "Inception: The Cobol Job"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/27205/recommendations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": 157336, "title": "Interstellar", "release_date": "2014-11-05", "vote_average": 8.4},
                    {"id": 155, "title": "The Dark Knight"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let id = client.resolve_id("Inception").await.unwrap();
        assert_eq!(id, Some(27205));

        let related = client.related(27205).await.unwrap();
        assert_eq!(related.len(), 2);
        assert_eq!(related[0].title(), "Interstellar");
        assert_eq!(related[0].year(), Some("2014"));
    }

    #[tokio::test]
    async fn test_resolve_id_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).resolve_id("zzzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_search_rejected_without_request() {
        let server = MockServer::start().await;
        let err = client(&server).search("   ").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
