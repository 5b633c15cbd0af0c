//! Resilient HTTP fetch client.
//!
//! One pooled `reqwest::Client` per process. Every request is retried on
//! connection failures, timeouts and transient statuses (429, 500, 502, 503,
//! 504) according to a [`RetryPolicy`]; other client errors fail at once.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::error::{is_retryable_status, FetchError};
use crate::retry::RetryPolicy;

/// HTTP client with bounded retry for a single API host.
#[derive(Clone)]
pub struct FetchClient {
    client: Client,
    base_url: String,
    policy: RetryPolicy,
    api_key: Option<SecretString>,
}

/// Builder for [`FetchClient`].
pub struct FetchClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
    policy: RetryPolicy,
    api_key: Option<SecretString>,
    bearer_token: Option<SecretString>,
}

impl FetchClientBuilder {
    /// Per-request timeout; a timed out attempt is retried.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Key sent as the `api_key` query parameter on every request.
    pub fn api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Token sent as `Authorization: Bearer ...` on every request.
    pub fn bearer_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(token);
        self
    }

    pub fn build(self) -> Result<FetchClient, FetchError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FetchError::InvalidRequest(format!(
                "base url must be http(s): {}",
                self.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| FetchError::InvalidRequest("invalid bearer token".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .default_headers(headers);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build client: {}", e)))?;

        Ok(FetchClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            policy: self.policy,
            api_key: self.api_key,
        })
    }
}

impl FetchClient {
    pub fn builder(base_url: impl Into<String>) -> FetchClientBuilder {
        FetchClientBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(15),
            user_agent: None,
            policy: RetryPolicy::default(),
            api_key: None,
            bearer_token: None,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `path` with query `params`, retrying transient failures.
    ///
    /// Returns the response body of the first successful attempt.
    pub async fn fetch(&self, path: &str, params: &[(&str, String)]) -> Result<String, FetchError> {
        let mut state = self.policy.start();

        loop {
            let attempt = state.begin_attempt();
            debug!(path, attempt, "Fetching");

            let (err, retry_after) = match self.attempt(path, params).await {
                Ok(body) => return Ok(body),
                Err(failure) => failure,
            };

            if !err.is_retryable() {
                warn!(path, attempt, error = %err, "Request failed, not retryable");
                return Err(err);
            }

            match state.next_delay(retry_after) {
                Some(delay) => {
                    warn!(
                        path,
                        attempt,
                        error = %err,
                        retry_in_ms = delay.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!(path, attempts = state.attempts(), error = %err, "Retries exhausted");
                    return Err(FetchError::RetriesExhausted {
                        path: path.to_string(),
                        attempts: state.attempts(),
                        last: Box::new(err),
                    });
                }
            }
        }
    }

    /// GET `path` and decode the JSON body into `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let body = self.fetch(path, params).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// One attempt. On failure also returns the server's Retry-After hint.
    async fn attempt(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, (FetchError, Option<Duration>)> {
        let transport = |e: reqwest::Error| {
            (
                FetchError::Transport {
                    path: path.to_string(),
                    message: e.without_url().to_string(),
                },
                None,
            )
        };

        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.expose_secret())]);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();

        if status.is_success() {
            return response.text().await.map_err(transport);
        }

        let retry_after = if is_retryable_status(status.as_u16()) {
            parse_retry_after(response.headers())
        } else {
            None
        };
        let body = response.text().await.unwrap_or_default();
        Err((
            FetchError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            },
            retry_after,
        ))
    }
}

/// Read a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
