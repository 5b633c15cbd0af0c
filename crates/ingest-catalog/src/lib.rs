//! # ingest-catalog
//!
//! Client for the external catalog API.
//!
//! - [`RetryPolicy`]: bounded exponential backoff per request
//! - [`FetchClient`]: pooled HTTP client that retries connection failures,
//!   timeouts and 429/5xx responses, honouring `Retry-After`
//! - [`CatalogClient`]: typed list, search and related endpoints
//! - [`CatalogSource`]: the paging seam the sweep is driven through

pub mod client;
pub mod error;
pub mod fetch;
pub mod retry;

pub use client::{CatalogClient, CatalogPage, CatalogSource, SEARCH_PATH};
pub use error::{is_retryable_status, CatalogError, FetchError};
pub use fetch::{FetchClient, FetchClientBuilder};
pub use retry::{RetryPolicy, RetryState};
