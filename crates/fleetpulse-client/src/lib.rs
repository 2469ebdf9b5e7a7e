//! Data-access layer for the FleetPulse backend.
//!
//! One typed operation per route-table entry, with the caching and polling
//! semantics the dashboard needs layered on top:
//!
//! - `transport` - the HTTP seam (real `reqwest` transport behind a trait)
//! - `executor` - authenticated request execution and envelope unwrapping
//! - `session` - the bearer credential + cached profile, behind an
//!   injectable persistence trait
//! - `cache` - query cache with TTLs, in-flight de-duplication and
//!   dependent-cache invalidation
//! - `client` - `FleetClient`, the typed operation surface
//! - `poll` - interval polling with explicit cancellation handles
//! - `fake` - a programmable transport for tests and offline use
//! - `config` - base URL and timeout configuration

pub mod cache;
pub mod client;
pub mod config;
pub mod executor;
pub mod fake;
pub mod poll;
pub mod session;
pub mod transport;

pub use cache::{QueryCache, QueryResult};
pub use client::{FleetClient, FleetClientBuilder, LoginOutcome};
pub use config::ClientConfig;
pub use executor::RequestExecutor;
pub use fake::FakeTransport;
pub use poll::{PollHandle, DETAIL_POLL_INTERVAL, LIST_POLL_INTERVAL, MAP_POLL_INTERVAL};
pub use session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, Session, SessionStore,
};
pub use transport::{HttpTransport, RawRequest, RawResponse, Transport};

// The contract crate re-exported for downstream convenience.
pub use fleetpulse_api as api;
