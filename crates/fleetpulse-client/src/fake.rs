//! Programmable in-memory transport for tests.
//!
//! Routes are stubbed by method plus path suffix; every request is logged so
//! tests can assert on call counts and request bodies. An optional per-stub
//! delay lets paused-clock tests overlap concurrent requests.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::Duration;

use fleetpulse_api::envelope::SUCCESS_CODE;
use fleetpulse_api::routes::Method;
use fleetpulse_api::ApiError;

use crate::transport::{RawRequest, RawResponse, Transport};

struct Stub {
    method: Method,
    path_suffix: String,
    status: u16,
    body: String,
    delay: Option<Duration>,
}

/// Test double for [`Transport`]. Later stubs win over earlier ones so a
/// test can override a default response mid-scenario.
#[derive(Clone, Default)]
pub struct FakeTransport {
    stubs: Arc<Mutex<Vec<Stub>>>,
    log: Arc<Mutex<Vec<RawRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub a route with a raw status and body.
    pub async fn stub(
        &self,
        method: Method,
        path_suffix: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) {
        self.stubs.lock().await.push(Stub {
            method,
            path_suffix: path_suffix.into(),
            status,
            body: body.into(),
            delay: None,
        });
    }

    /// Stub a route with a success envelope wrapping `data`.
    pub async fn stub_envelope(&self, method: Method, path_suffix: impl Into<String>, data: Value) {
        let body = json!({
            "responseCode": SUCCESS_CODE,
            "responseMessage": "Success",
            "data": data,
        });
        self.stub(method, path_suffix, 200, body.to_string()).await;
    }

    /// Stub a backend rejection: HTTP 200 with a non-success envelope code.
    pub async fn stub_rejection(
        &self,
        method: Method,
        path_suffix: impl Into<String>,
        code: &str,
        message: &str,
    ) {
        let body = json!({
            "responseCode": code,
            "responseMessage": message,
        });
        self.stub(method, path_suffix, 200, body.to_string()).await;
    }

    /// Add a delay to the most recently added stub.
    pub async fn delay_last(&self, delay: Duration) {
        if let Some(stub) = self.stubs.lock().await.last_mut() {
            stub.delay = Some(delay);
        }
    }

    pub async fn requests(&self) -> Vec<RawRequest> {
        self.log.lock().await.clone()
    }

    pub async fn call_count(&self, path_suffix: &str) -> usize {
        self.log
            .lock()
            .await
            .iter()
            .filter(|r| path_matches(&r.url, path_suffix))
            .count()
    }
}

fn path_matches(url: &str, suffix: &str) -> bool {
    // Compare against the path only, ignoring the scheme and host.
    let path = url
        .find("://")
        .and_then(|i| url[i + 3..].find('/').map(|j| &url[i + 3 + j..]))
        .unwrap_or(url);
    path == suffix || path.ends_with(suffix)
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, ApiError> {
        self.log.lock().await.push(request.clone());
        let matched = {
            let stubs = self.stubs.lock().await;
            stubs
                .iter()
                .rev()
                .find(|s| s.method == request.method && path_matches(&request.url, &s.path_suffix))
                .map(|s| (s.status, s.body.clone(), s.delay))
        };
        match matched {
            Some((status, body, delay)) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(RawResponse { status, body })
            }
            None => Err(ApiError::Network {
                message: format!("no stub for {} {}", request.method, request.url),
            }),
        }
    }
}
