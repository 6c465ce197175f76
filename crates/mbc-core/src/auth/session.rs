use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{Storage, StorageError};

/// Storage slot holding the session. Must not collide with cache keys.
pub const SESSION_KEY: &str = "mbc-state";

/// Envelope version written alongside the state
const SESSION_VERSION: u32 = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub token: Option<String>,
}

/// On-disk shape of the slot: `{"state":{"token":...},"version":0}`
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    state: SessionState,
    #[serde(default)]
    version: u32,
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: SessionState,
}

impl SessionStore {
    /// Create an empty store without reading the slot.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            state: SessionState::default(),
        }
    }

    /// Create a store restored from the slot.
    /// A corrupt slot is logged and treated as signed out.
    pub fn load(storage: Arc<dyn Storage>) -> Result<Self, StorageError> {
        let mut store = Self::new(storage);
        if let Some(raw) = store.storage.read(SESSION_KEY)? {
            match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(persisted) => {
                    debug!(
                        version = persisted.version,
                        authenticated = persisted.state.token.is_some(),
                        "Restored session"
                    );
                    store.state = persisted.state;
                }
                Err(e) => {
                    warn!(key = SESSION_KEY, error = %e, "Ignoring malformed session slot");
                }
            }
        }
        Ok(store)
    }

    /// Get the bearer token, if signed in
    pub fn get_token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.token.is_some()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Replace the token and persist it before returning.
    pub fn update(&mut self, token: impl Into<String>) -> Result<(), StorageError> {
        self.state.token = Some(token.into());
        self.persist()
    }

    /// Drop the token and persist the signed-out state.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.state.token = None;
        self.persist()
    }

    fn persist(&self) -> Result<(), StorageError> {
        let persisted = PersistedSession {
            state: self.state.clone(),
            version: SESSION_VERSION,
        };
        let contents = serde_json::to_string(&persisted)?;
        self.storage.write(SESSION_KEY, &contents)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
