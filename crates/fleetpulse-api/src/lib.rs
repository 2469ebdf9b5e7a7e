//! Contract layer for the FleetPulse backend API.
//!
//! This crate holds everything the data-access layer in `fleetpulse-client`
//! needs to talk to the backend, without performing any I/O itself:
//!
//! - `routes` - the route contract table (one descriptor per endpoint) and
//!   URL templating
//! - `schema` - structural input and response-shape validation
//! - `envelope` - the `{responseCode, responseMessage, data}` wrapper every
//!   backend response uses
//! - `models` - serde models for the wire contract
//! - `error` - the error taxonomy shared across the SDK

pub mod envelope;
pub mod error;
pub mod models;
pub mod routes;
pub mod schema;

pub use envelope::{Envelope, SUCCESS_CODE};
pub use error::{ApiError, Violation};
pub use models::{
    Employee, Landing, LoginData, LoginRequest, RegisterRequest, RegisterVehicleRequest,
    ResetPasswordRequest, Role, UpdateVehicleRequest, Vehicle, VehicleTelemetry,
};
pub use routes::{build_url, Method, Operation, Params, RouteDescriptor};
pub use schema::{FieldKind, FieldRule, InputSchema, ResponseShape};
