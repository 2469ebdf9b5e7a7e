//! `FleetClient`: one typed operation per route-table entry.
//!
//! Reads go through the query cache (10s list TTL, 5s detail TTL) and come
//! back as [`QueryResult`]s; mutations invalidate their dependent reads only
//! after confirmed success. Every authenticated call that comes back
//! `Unauthorized` clears the stored credential before the error propagates,
//! so the next session check reads "no session" without a network call.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Duration;
use tracing::{debug, info};

use fleetpulse_api::models::{
    Employee, Landing, LoginData, LoginRequest, RegisterRequest, RegisterVehicleRequest,
    ResetPasswordRequest, UpdateVehicleRequest, Vehicle, VehicleTelemetry,
};
use fleetpulse_api::routes::{Operation, Params};
use fleetpulse_api::ApiError;

use crate::cache::{QueryCache, QueryResult};
use crate::config::ClientConfig;
use crate::executor::RequestExecutor;
use crate::poll::{DETAIL_POLL_INTERVAL, LIST_POLL_INTERVAL};
use crate::session::{CredentialStore, MemoryCredentialStore, Session, SessionStore};
use crate::transport::{HttpTransport, Transport};

/// What a successful login yields: the profile plus where to land.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub employee: Employee,
    pub landing: Landing,
}

#[derive(Clone)]
pub struct FleetClient {
    executor: Arc<RequestExecutor>,
    cache: Arc<QueryCache>,
    session: Arc<SessionStore>,
}

pub struct FleetClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl FleetClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::from_env(),
            transport: None,
            credentials: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Inject a transport (e.g. [`crate::FakeTransport`] in tests).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Inject a credential store; defaults to an in-memory one.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> FleetClient {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new(&self.config)));
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        FleetClient {
            executor: Arc::new(RequestExecutor::new(transport, self.config.base_url)),
            cache: Arc::new(QueryCache::new()),
            session: Arc::new(SessionStore::new(credentials)),
        }
    }
}

impl Default for FleetClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetClient {
    pub fn builder() -> FleetClientBuilder {
        FleetClientBuilder::new()
    }

    pub fn session(&self) -> Arc<SessionStore> {
        Arc::clone(&self.session)
    }

    /// Execute an authenticated operation; a 401 clears the credential
    /// (forced logout) before the error reaches the caller.
    pub(crate) async fn execute_authed(
        &self,
        op: Operation,
        params: &Params,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let token = self.session.token().await;
        match self.executor.execute(op, params, body, token.as_deref()).await {
            Err(err @ ApiError::Unauthorized { .. }) => {
                if let Err(clear_err) = self.session.clear().await {
                    debug!("[FleetClient] failed to clear credential: {}", clear_err);
                }
                Err(err)
            }
            other => other,
        }
    }

    async fn read(
        &self,
        op: Operation,
        params: Params,
        ttl: Duration,
    ) -> QueryResult<Value> {
        self.cache
            .fetch(op, &params, ttl, || async {
                self.execute_authed(op, &params, None).await
            })
            .await
    }

    async fn mutate(
        &self,
        op: Operation,
        params: Params,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let payload = self.execute_authed(op, &params, body.as_ref()).await?;
        // Only a confirmed success invalidates; a failed mutation must never
        // leave the cache partially invalidated.
        self.cache.invalidate_dependents(op).await;
        Ok(payload)
    }

    fn to_body<T: serde::Serialize>(request: &T) -> Result<Value, ApiError> {
        serde_json::to_value(request)
            .map_err(|e| ApiError::unexpected_shape(format!("serialize request body: {}", e)))
    }

    // --- auth ------------------------------------------------------------

    /// POST /login - establish a session and pick the landing page by role.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome, ApiError> {
        let body = Self::to_body(request)?;
        let payload = self
            .executor
            .execute(Operation::Login, &Params::new(), Some(&body), None)
            .await?;
        self.establish_from(payload, "login").await
    }

    /// POST /register - create an account; the backend logs the new
    /// employee straight in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<LoginOutcome, ApiError> {
        let body = Self::to_body(request)?;
        let payload = self
            .executor
            .execute(Operation::Register, &Params::new(), Some(&body), None)
            .await?;
        self.establish_from(payload, "register").await
    }

    async fn establish_from(&self, payload: Value, what: &str) -> Result<LoginOutcome, ApiError> {
        let data: LoginData = serde_json::from_value(payload)
            .map_err(|e| ApiError::unexpected_shape(format!("{} payload: {}", what, e)))?;
        self.session
            .establish(Session {
                access_token: data.access_token,
                employee: data.employee.clone(),
            })
            .await?;
        info!("[FleetClient] {} succeeded: {}", what, data.employee.email);
        Ok(LoginOutcome {
            landing: data.employee.landing(),
            employee: data.employee,
        })
    }

    /// GET /me - session bootstrap. No stored token short-circuits to
    /// `Ok(None)` without touching the network; a 401 clears the stale
    /// credential and also reads as `Ok(None)`.
    pub async fn current_user(&self) -> Result<Option<Employee>, ApiError> {
        let Some(token) = self.session.token().await else {
            return Ok(None);
        };
        match self
            .executor
            .execute(Operation::CurrentUser, &Params::new(), None, Some(&token))
            .await
        {
            Ok(payload) => {
                let employee: Employee = serde_json::from_value(payload)
                    .map_err(|e| ApiError::unexpected_shape(format!("profile payload: {}", e)))?;
                self.session.update_employee(employee.clone()).await?;
                Ok(Some(employee))
            }
            Err(ApiError::Unauthorized { .. }) => {
                self.session.clear().await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// POST /logout - best effort on the wire; credential and cache are
    /// cleared together regardless.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if let Some(token) = self.session.token().await {
            if let Err(err) = self
                .executor
                .execute(Operation::Logout, &Params::new(), None, Some(&token))
                .await
            {
                debug!("[FleetClient] logout request failed: {}", err);
            }
        }
        self.session.clear().await?;
        self.cache.clear().await;
        Ok(())
    }

    // --- vehicles ---------------------------------------------------------

    /// GET /vehicles - the caller's fleet; cached for the list interval.
    pub async fn vehicles(&self) -> QueryResult<Vec<Vehicle>> {
        self.vehicles_with_ttl(LIST_POLL_INTERVAL).await
    }

    pub(crate) async fn vehicles_with_ttl(&self, ttl: Duration) -> QueryResult<Vec<Vehicle>> {
        // The backend answers a bare success envelope when the fleet is
        // empty; treat a null payload as an empty list.
        self.read(Operation::VehicleList, Params::new(), ttl)
            .await
            .decode::<Option<Vec<Vehicle>>>(Operation::VehicleList)
            .map(Option::unwrap_or_default)
    }

    /// GET /vehicle/:imei/data - latest telemetry snapshot; `Ok(None)` when
    /// the sensor has never reported.
    pub async fn vehicle_data(&self, imei: &str) -> QueryResult<Option<VehicleTelemetry>> {
        self.vehicle_data_with_ttl(imei, DETAIL_POLL_INTERVAL).await
    }

    pub(crate) async fn vehicle_data_with_ttl(
        &self,
        imei: &str,
        ttl: Duration,
    ) -> QueryResult<Option<VehicleTelemetry>> {
        let mut params = Params::new();
        params.insert("imei".to_string(), imei.to_string());
        let raw = self
            .cache
            .fetch(Operation::VehicleData, &params, ttl, || async {
                match self
                    .execute_authed(Operation::VehicleData, &params, None)
                    .await
                {
                    // A vehicle with no telemetry yet is not an error state.
                    Err(ApiError::NotFound { .. }) => Ok(Value::Null),
                    other => other,
                }
            })
            .await;
        raw.decode::<Option<VehicleTelemetry>>(Operation::VehicleData)
    }

    /// POST /sync - ask the backend to re-pull from the telemetry feed;
    /// invalidates the vehicle list.
    pub async fn sync_vehicles(&self) -> Result<(), ApiError> {
        self.mutate(Operation::VehicleSync, Params::new(), None)
            .await?;
        Ok(())
    }

    // --- admin ------------------------------------------------------------

    /// GET /admin/user/:email - explicit search-by-email; the backend has no
    /// list-all-users endpoint.
    pub async fn admin_user(&self, email: &str) -> QueryResult<Employee> {
        let mut params = Params::new();
        params.insert("email".to_string(), email.to_string());
        self.read(Operation::AdminUserGet, params, LIST_POLL_INTERVAL)
            .await
            .decode(Operation::AdminUserGet)
    }

    /// GET /admin/user/:email/vehicles - full vehicle records for one owner.
    pub async fn admin_user_vehicles(&self, email: &str) -> QueryResult<Vec<Vehicle>> {
        let mut params = Params::new();
        params.insert("email".to_string(), email.to_string());
        self.read(Operation::AdminUserVehicles, params, LIST_POLL_INTERVAL)
            .await
            .decode::<Option<Vec<Vehicle>>>(Operation::AdminUserVehicles)
            .map(Option::unwrap_or_default)
    }

    /// POST /admin/reset-password.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<(), ApiError> {
        let body = Self::to_body(request)?;
        self.mutate(Operation::AdminResetPassword, Params::new(), Some(body))
            .await?;
        Ok(())
    }

    /// POST /admin/register-vehicle - invalidates the vehicle list.
    pub async fn register_vehicle(
        &self,
        request: &RegisterVehicleRequest,
    ) -> Result<(), ApiError> {
        let body = Self::to_body(request)?;
        self.mutate(Operation::AdminRegisterVehicle, Params::new(), Some(body))
            .await?;
        Ok(())
    }

    /// PUT /admin/vehicle/:vehicle_id - partial update; invalidates the
    /// vehicle list and the owner's admin listing.
    pub async fn update_vehicle(
        &self,
        vehicle_id: i64,
        patch: &UpdateVehicleRequest,
    ) -> Result<(), ApiError> {
        let mut params = Params::new();
        params.insert("vehicle_id".to_string(), vehicle_id.to_string());
        let body = Self::to_body(patch)?;
        self.mutate(Operation::AdminUpdateVehicle, params, Some(body))
            .await?;
        Ok(())
    }
}
