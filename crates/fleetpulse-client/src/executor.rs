//! Authenticated request executor.
//!
//! Turns an operation + params + optional body into an envelope-unwrapped
//! payload: descriptor lookup, input validation (validation errors never
//! reach the network), URL templating, transport send, status
//! classification and response-shape checking. The contract table is the
//! single enforcement point; no caller does its own response checks.
//!
//! The executor is side-effect-free beyond the network call - credential
//! clearing on `Unauthorized` is the client layer's job.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use fleetpulse_api::envelope::Envelope;
use fleetpulse_api::routes::{build_url, Operation, Params, RouteDescriptor};
use fleetpulse_api::schema::ResponseShape;
use fleetpulse_api::ApiError;

use crate::transport::{RawRequest, RawResponse, Transport};

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            transport,
            base_url,
        }
    }

    /// Execute `op` and return the success payload (the envelope's `data`).
    #[tracing::instrument(name = "executor.execute", skip_all, fields(op = op.name()))]
    pub async fn execute(
        &self,
        op: Operation,
        params: &Params,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let route = op.descriptor();

        if let (Some(schema), Some(body)) = (&route.input, body) {
            schema.validate(body)?;
        }

        let path = build_url(route.path, params)?;
        let url = format!("{}{}", self.base_url, path);
        debug!("[Executor] {} {}", route.method, url);

        let response = self
            .transport
            .send(RawRequest {
                method: route.method,
                url,
                bearer: token.map(str::to_owned),
                body: body.cloned(),
            })
            .await?;

        Self::interpret(route, response)
    }

    /// Classify the transport status and unwrap the envelope.
    fn interpret(route: &RouteDescriptor, response: RawResponse) -> Result<Value, ApiError> {
        let status = response.status;
        let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
        let shape = route.response_shape(status);
        let message = extract_message(shape, parsed.as_ref(), status);

        match status {
            401 => return Err(ApiError::Unauthorized { message }),
            404 => return Err(ApiError::NotFound { message }),
            s if (400..500).contains(&s) => {
                let field = parsed
                    .as_ref()
                    .and_then(|v| v.get("field"))
                    .and_then(Value::as_str)
                    .unwrap_or("request");
                return Err(ApiError::validation(field, message));
            }
            s if s >= 500 => return Err(ApiError::Server { status, message }),
            _ => {}
        }

        let body = parsed.ok_or(ApiError::Server {
            status,
            message: "response body was not valid JSON".to_string(),
        })?;

        let shape = shape.ok_or_else(|| {
            ApiError::unexpected_shape(format!("no response shape declared for status {}", status))
        })?;
        shape.check(&body)?;

        match shape {
            ResponseShape::Envelope => {
                let envelope: Envelope = serde_json::from_value(body)
                    .map_err(|e| ApiError::unexpected_shape(format!("invalid envelope: {}", e)))?;
                envelope.into_payload()
            }
            ResponseShape::Message => Ok(body),
        }
    }
}

/// Best message we can surface for an error response. The field named by the
/// shape declared for this status is consulted first (a bare `{message}` body
/// or the envelope's `responseMessage`), then the other wire field, then the
/// status code.
fn extract_message(shape: Option<ResponseShape>, parsed: Option<&Value>, status: u16) -> String {
    let keys = match shape {
        Some(ResponseShape::Message) => ["message", "responseMessage"],
        _ => ["responseMessage", "message"],
    };
    parsed
        .and_then(|v| {
            keys.iter()
                .find_map(|k| v.get(k).and_then(Value::as_str))
                .map(str::to_owned)
        })
        .unwrap_or_else(|| format!("HTTP {} error", status))
}
