//! Client configuration.

use std::time::Duration;

/// Production backend base URL; overridable via `FLEETPULSE_BASE_URL`.
pub const DEFAULT_BASE_URL: &str = "https://fleetpulse-io7s.onrender.com";

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "FLEETPULSE_BASE_URL";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Transport-level request budget; a request resolves or fails within it.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }
}
