//! HTTP API client with bearer-token injection and centralized error observation.

use std::fmt;
use std::sync::Arc;

use gather_shared::{ApiError, Event, EventChanges, EventId, NewEvent};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{bearer_value, TokenProvider};

/// Side-effect hook that sees every transport failure exactly once.
///
/// Observers cannot change the outcome: the same error is returned to the
/// caller after `on_error` runs.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, error: &ApiError);
}

impl<F> ErrorObserver for F
where
    F: Fn(&ApiError) + Send + Sync,
{
    fn on_error(&self, error: &ApiError) {
        self(error)
    }
}

/// Logs failures as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrors;

impl ErrorObserver for LogErrors {
    fn on_error(&self, error: &ApiError) {
        match error.status() {
            Some(status) => tracing::warn!(status, message = %error.user_message(), "api request failed"),
            None => tracing::warn!(%error, "api request failed"),
        }
    }
}

/// Construction parameters for [`ApiClient`].
pub struct RequestConfig {
    pub base_url: String,
    pub tokens: Arc<dyn TokenProvider>,
    pub errors: Arc<dyn ErrorObserver>,
}

impl RequestConfig {
    pub fn new(
        base_url: impl Into<String>,
        tokens: impl TokenProvider + 'static,
        errors: impl ErrorObserver + 'static,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            tokens: Arc::new(tokens),
            errors: Arc::new(errors),
        }
    }
}

/// A successful (2xx) response, as received.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let text = if self.body.is_empty() { "null" } else { self.body.as_str() };
        serde_json::from_str(text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }
}

/// HTTP client for the Gather API.
///
/// Cloning is cheap; clones share the connection pool and capabilities.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    errors: Arc<dyn ErrorObserver>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: RequestConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Use a preconfigured `reqwest::Client` (proxies, TLS roots, timeouts).
    pub fn with_client(client: Client, config: RequestConfig) -> Self {
        Self {
            client,
            base_url: config.base_url,
            tokens: config.tokens,
            errors: config.errors,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    fn prepare(&self, method: Method, path: &str) -> RequestBuilder {
        let mut rb = self.client.request(method, self.url(path));
        if let Some(value) = bearer_value(self.tokens.as_ref()) {
            rb = rb.header(AUTHORIZATION, value);
        }
        rb
    }

    async fn execute(&self, rb: RequestBuilder) -> Result<ApiResponse, ApiError> {
        let result = transmit(rb).await;
        if let Err(error) = &result {
            self.errors.on_error(error);
        }
        result
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        tracing::debug!(path, "GET");
        self.execute(self.prepare(Method::GET, path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        tracing::debug!(path, "POST");
        self.execute(self.prepare(Method::POST, path).json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        tracing::debug!(path, "PUT");
        self.execute(self.prepare(Method::PUT, path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        tracing::debug!(path, "DELETE");
        self.execute(self.prepare(Method::DELETE, path)).await
    }

    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        self.get(path).await?.json()
    }

    pub async fn post_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        self.post(path, body).await?.json()
    }

    pub async fn put_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        self.put(path, body).await?.json()
    }

    // --- Event API methods ---

    pub async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
        self.get_json("/events").await
    }

    pub async fn get_event(&self, id: &EventId) -> Result<Event, ApiError> {
        self.get_json(&format!("/events/{id}")).await
    }

    pub async fn create_event(&self, event: &NewEvent) -> Result<Event, ApiError> {
        self.post_json("/events", event).await
    }

    pub async fn update_event(&self, id: &EventId, changes: &EventChanges) -> Result<Event, ApiError> {
        self.put_json(&format!("/events/{id}"), changes).await
    }

    pub async fn delete_event(&self, id: &EventId) -> Result<(), ApiError> {
        self.delete(&format!("/events/{id}")).await.map(|_| ())
    }
}

async fn transmit(rb: RequestBuilder) -> Result<ApiResponse, ApiError> {
    let resp = rb.send().await.map_err(|e| {
        if e.is_builder() {
            ApiError::Request(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    })?;

    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp
        .text()
        .await
        .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            body,
        });
    }

    Ok(ApiResponse { status, headers, body })
}

#[cfg(test)]
#[path = "api_client_test.rs"]
mod tests;
