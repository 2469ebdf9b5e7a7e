//! Session credential: bearer token + cached employee profile.
//!
//! The store is an explicit, injectable object owned by the client and handed
//! to every operation; there is no ambient global token. Persistence goes
//! through the `CredentialStore` trait under fixed keys, so a real client can
//! survive restarts (file store) while tests inject a memory store or a fake
//! session.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use fleetpulse_api::models::Employee;
use fleetpulse_api::ApiError;

/// Fixed persistence key for the bearer token.
pub const TOKEN_KEY: &str = "fleetpulse.token";
/// Fixed persistence key for the cached employee profile (JSON).
pub const EMPLOYEE_KEY: &str = "fleetpulse.employee";

/// Key-value persistence for credentials; the analogue of the browser's
/// local storage in the original dashboard.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, ApiError>;
    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError>;
    async fn remove(&self, key: &str) -> Result<(), ApiError>;
}

/// In-memory credential store (tests, ephemeral sessions).
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Credential store persisted as a single JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store, reading any previously persisted entries. A missing
    /// file is an empty store; an unreadable one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ApiError::unexpected_shape(format!(
                    "corrupt credential file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(ApiError::Network {
                    message: format!("cannot read credential file {}: {}", path.display(), e),
                })
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), ApiError> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| ApiError::unexpected_shape(format!("serialize credentials: {}", e)))?;
        std::fs::write(&self.path, raw).map_err(|e| ApiError::Network {
            message: format!("cannot write credential file {}: {}", self.path.display(), e),
        })
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    async fn remove(&self, key: &str) -> Result<(), ApiError> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        self.persist(&entries)
    }
}

/// The current authenticated actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub employee: Employee,
}

#[derive(Default)]
struct SessionState {
    restored: bool,
    session: Option<Session>,
}

/// Owner of the in-memory session, backed by a `CredentialStore`.
///
/// Token and profile are saved and cleared together; a half-persisted
/// credential is never observable.
pub struct SessionStore {
    store: Arc<dyn CredentialStore>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Current session, restoring from the persisted store on first use
    /// (the page-reload path of the original dashboard).
    pub async fn current(&self) -> Option<Session> {
        {
            let state = self.state.read().await;
            if state.restored {
                return state.session.clone();
            }
        }

        let mut state = self.state.write().await;
        if !state.restored {
            state.session = self.restore().await;
            state.restored = true;
        }
        state.session.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.current().await.map(|s| s.access_token)
    }

    /// Store a freshly issued credential, in memory and persisted.
    pub async fn establish(&self, session: Session) -> Result<(), ApiError> {
        self.store
            .save(TOKEN_KEY, &session.access_token)
            .await?;
        let profile = serde_json::to_string(&session.employee)
            .map_err(|e| ApiError::unexpected_shape(format!("serialize profile: {}", e)))?;
        self.store.save(EMPLOYEE_KEY, &profile).await?;

        let mut state = self.state.write().await;
        state.restored = true;
        state.session = Some(session);
        Ok(())
    }

    /// Refresh the cached profile without touching the token.
    pub async fn update_employee(&self, employee: Employee) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        if let Some(session) = &mut state.session {
            let profile = serde_json::to_string(&employee)
                .map_err(|e| ApiError::unexpected_shape(format!("serialize profile: {}", e)))?;
            self.store.save(EMPLOYEE_KEY, &profile).await?;
            session.employee = employee;
        }
        Ok(())
    }

    /// Drop the credential everywhere: memory and both persisted keys.
    pub async fn clear(&self) -> Result<(), ApiError> {
        self.store.remove(TOKEN_KEY).await?;
        self.store.remove(EMPLOYEE_KEY).await?;
        let mut state = self.state.write().await;
        state.restored = true;
        state.session = None;
        debug!("[SessionStore] credential cleared");
        Ok(())
    }

    async fn restore(&self) -> Option<Session> {
        let token = match self.store.load(TOKEN_KEY).await {
            Ok(token) => token?,
            Err(e) => {
                warn!("[SessionStore] failed to load token: {}", e);
                return None;
            }
        };
        let profile = match self.store.load(EMPLOYEE_KEY).await {
            Ok(profile) => profile?,
            Err(e) => {
                warn!("[SessionStore] failed to load profile: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<Employee>(&profile) {
            Ok(employee) => Some(Session {
                access_token: token,
                employee,
            }),
            Err(e) => {
                // A corrupt profile cannot brick the client; treat as logged out.
                warn!("[SessionStore] corrupt persisted profile, ignoring: {}", e);
                None
            }
        }
    }
}
