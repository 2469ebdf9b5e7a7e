//! HTTP transport seam.
//!
//! The executor talks to `dyn Transport`, so the real reqwest transport and
//! the programmable fake in `fake` are interchangeable. A transport only
//! moves bytes; classification of statuses and envelope handling live in the
//! executor.

use async_trait::async_trait;
use tracing::debug;

use fleetpulse_api::routes::Method;
use fleetpulse_api::ApiError;

use crate::config::ClientConfig;

/// A fully built request: URL already templated, body already validated.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue the request. `Err` means the request never completed; a response
    /// with any HTTP status is `Ok`.
    async fn send(&self, request: RawRequest) -> Result<RawResponse, ApiError>;
}

/// Transport over a shared `reqwest::Client`.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Classify a reqwest error into a message a user can act on.
    fn describe_error(e: &reqwest::Error, url: &str) -> String {
        if e.is_timeout() {
            format!("request to {} timed out", url)
        } else if e.is_connect() {
            format!("could not connect to {}: {}", url, e)
        } else if e.is_request() {
            format!("malformed request for {}: {}", url, e)
        } else {
            format!("request to {} failed: {}", url, e)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, ApiError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            "[HttpTransport] {} {} (auth={})",
            request.method,
            request.url,
            request.bearer.is_some()
        );

        let response = builder.send().await.map_err(|e| ApiError::Network {
            message: Self::describe_error(&e, &request.url),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ApiError::Network {
            message: format!("failed to read response body from {}: {}", request.url, e),
        })?;

        Ok(RawResponse { status, body })
    }
}
