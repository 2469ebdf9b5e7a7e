//! Error taxonomy for the FleetPulse SDK.
//!
//! Every failure a caller can observe is one of these variants. Display
//! strings are written for direct UI display; callers surface
//! `error.to_string()` instead of a stack trace.

use serde::{Deserialize, Serialize};

/// A single input-validation violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Errors produced by the contract layer and the data-access layer.
///
/// Clonable so cached/broadcast results can carry it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Client-side validation failure; never reaches the network.
    /// Carries every violation, not just the first.
    #[error("Invalid input: {}", .violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; "))]
    Validation { violations: Vec<Violation> },

    /// A URL template placeholder had no substitution value.
    #[error("Missing URL parameter: {name}")]
    MissingParameter { name: String },

    /// Missing, expired or invalid bearer token (HTTP 401).
    #[error("{message}")]
    Unauthorized { message: String },

    /// The requested resource does not exist (HTTP 404).
    #[error("{message}")]
    NotFound { message: String },

    /// The envelope signalled a logical failure (`responseCode != "00"`),
    /// regardless of the transport status.
    #[error("{message}")]
    Backend { code: String, message: String },

    /// 5xx or an unparseable response body.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The request never completed (DNS, connect, timeout, ...).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The response did not match the shape declared for its status code.
    #[error("Unexpected response shape: {message}")]
    UnexpectedShape { message: String },
}

impl ApiError {
    /// Single-violation constructor, for callers that only have one failure
    /// to report (e.g. a 400-class response carrying a field name).
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::Validation {
            violations: vec![Violation {
                field: field.into(),
                reason: reason.into(),
            }],
        }
    }

    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        ApiError::UnexpectedShape {
            message: message.into(),
        }
    }
}
