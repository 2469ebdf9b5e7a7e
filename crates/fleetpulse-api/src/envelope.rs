//! The standard backend response envelope.
//!
//! Every backend response wraps its payload in
//! `{ responseCode, responseMessage, data? }`. `responseCode == "00"` is the
//! only logical success; any other value means the operation failed even when
//! the transport reported 200, and callers must surface `responseMessage`
//! rather than the payload.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// The response code the backend uses for logical success.
pub const SUCCESS_CODE: &str = "00";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "responseCode")]
    pub response_code: String,
    #[serde(rename = "responseMessage")]
    pub response_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.response_code == SUCCESS_CODE
    }

    /// Unwrap the payload, turning a non-success code into `ApiError::Backend`.
    ///
    /// An absent `data` field on success yields `Value::Null`; several
    /// mutation endpoints respond with a bare success envelope.
    pub fn into_payload(self) -> Result<serde_json::Value, ApiError> {
        if !self.is_success() {
            return Err(ApiError::Backend {
                code: self.response_code,
                message: self.response_message,
            });
        }
        Ok(self.data.unwrap_or(serde_json::Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_unwraps_payload() {
        let envelope: Envelope = serde_json::from_value(json!({
            "responseCode": "00",
            "responseMessage": "OK",
            "data": {"vehicles": []},
        }))
        .unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.into_payload().unwrap(), json!({"vehicles": []}));
    }

    #[test]
    fn missing_data_on_success_is_null() {
        let envelope: Envelope = serde_json::from_value(json!({
            "responseCode": "00",
            "responseMessage": "synced",
        }))
        .unwrap();
        assert_eq!(envelope.into_payload().unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn non_success_code_is_a_backend_error() {
        let envelope: Envelope = serde_json::from_value(json!({
            "responseCode": "01",
            "responseMessage": "Invalid credentials",
        }))
        .unwrap();
        let err = envelope.into_payload().unwrap_err();
        assert_eq!(
            err,
            ApiError::Backend {
                code: "01".into(),
                message: "Invalid credentials".into(),
            }
        );
    }
}
