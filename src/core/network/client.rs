//! HTTP Client Implementations
//!
//! Provides the HTTP client abstraction used by both the network probe and the
//! failover proxy: arbitrary method, JSON body, per-request timeout, and access to
//! status, content type and raw body.

use crate::core::network::types::{HttpMethod, NetworkError};
use std::time::{Duration, Instant};

use isahc::config::{Configurable, RedirectPolicy};
use isahc::{AsyncReadResponseExt, HttpClient, Request};

/// Raw response from a backend, before any JSON interpretation
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status_code: u16,
    /// `Content-Type` header, lower-cased, if present
    pub content_type: Option<String>,
    /// Response body
    pub body: Vec<u8>,
    /// Request duration for logging
    pub duration: Duration,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Why a request produced no HTTP response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The request could not be built; nothing left this process
    #[error("Request creation failed: {0}")]
    InvalidRequest(String),
    /// Connection, DNS, timeout or body read failure
    #[error("{0}")]
    Transport(String),
}

/// HTTP client abstraction for dependency injection and testing
#[async_trait::async_trait]
pub trait HttpClientTrait: Send + Sync {
    /// Execute one HTTP request
    ///
    /// # Arguments
    /// * `method` - Request method
    /// * `url` - Complete URL including query string
    /// * `body` - Serialized JSON body (empty for GET/HEAD)
    /// * `timeout_ms` - Request timeout in milliseconds; expiry aborts the request
    ///
    /// # Returns
    /// * `Ok(HttpResponse)` - Any HTTP response, including non-2xx
    /// * `Err(SendError::Transport)` - Connection, DNS or timeout failure
    /// * `Err(SendError::InvalidRequest)` - Malformed URL or header, never sent
    async fn send(
        &self,
        method: HttpMethod,
        url: String,
        body: Vec<u8>,
        timeout_ms: u64,
    ) -> Result<HttpResponse, SendError>;
}

/// Production HTTP client implementation using isahc
pub struct IsahcHttpClient {
    client: HttpClient,
}

#[async_trait::async_trait]
impl HttpClientTrait for IsahcHttpClient {
    async fn send(
        &self,
        method: HttpMethod,
        url: String,
        body: Vec<u8>,
        timeout_ms: u64,
    ) -> Result<HttpResponse, SendError> {
        let start = Instant::now();

        let mut builder = Request::builder()
            .method(method.as_str())
            .uri(&url)
            .timeout(Duration::from_millis(timeout_ms))
            .header("Accept", "application/json, text/plain, */*");
        if method.allows_body() {
            builder = builder.header("Content-Type", "application/json");
        }
        let request = builder
            .body(body)
            .map_err(|e| SendError::InvalidRequest(e.to_string()))?;

        let mut response = self
            .client
            .send_async(request)
            .await
            .map_err(|e| SendError::Transport(format!("Request failed: {}", e)))?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase());

        let body = response
            .bytes()
            .await
            .map_err(|e| SendError::Transport(format!("Failed to read response body: {}", e)))?
            .to_vec();

        Ok(HttpResponse {
            status_code,
            content_type,
            body,
            duration: start.elapsed(),
        })
    }
}

impl IsahcHttpClient {
    pub fn new() -> Result<Self, NetworkError> {
        let client = HttpClient::builder()
            .redirect_policy(RedirectPolicy::Limit(3))
            .build()
            .map_err(|e| NetworkError::HttpError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}
