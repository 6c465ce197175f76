//! Application context for the member client.
//!
//! `Portal` is the single owner of the session store, the expiring cache
//! and the API client. Every member flow goes through it, so the token
//! that decides what a member may see is also the one attached to the
//! outgoing requests.

use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::SessionStore;
use crate::cache::{CacheError, Clock, ExpiringCache, SystemClock};
use crate::config::Config;
use crate::models::{Member, NavigationItem, Page, ProfileUpdate, Registration};
use crate::storage::{FileStorage, Storage, StorageError};

/// Cache key for the navigation menu
pub const NAVIGATION_CACHE_KEY: &str = "navigation";

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Already signed in")]
    AlreadySignedIn,

    #[error("{0}")]
    Validation(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl PortalError {
    /// Text to show the member. Backend messages use the form's wording.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Api(e) => e.member_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub member: Member,
    /// False when the backend wants the email address confirmed first
    pub signed_in: bool,
}

pub struct Portal {
    config: Config,
    storage: Arc<dyn Storage>,
    session: SessionStore,
    cache: ExpiringCache,
    api: ApiClient,
}

impl Portal {
    /// Open the portal over the on-disk session directory from `config`.
    pub fn open(config: Config) -> Result<Self> {
        let dir = config.session_dir()?;
        debug!(?dir, "Session directory configured");
        Self::with_storage(config, Arc::new(FileStorage::new(dir)), Arc::new(SystemClock))
    }

    /// Open the portal over any storage backend and clock.
    pub fn with_storage(config: Config, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Result<Self> {
        let session = SessionStore::load(storage.clone()).context("Failed to read session")?;

        let mut api = ApiClient::new(config.api_url())
            .context("Failed to build HTTP client")?
            .with_api_key(config.api_key.clone());
        api.set_token(session.get_token().map(str::to_string));
        debug!(
            api_url = config.api_url(),
            authenticated = session.is_authenticated(),
            "Portal opened"
        );

        let cache = ExpiringCache::with_clock(storage.clone(), clock);

        Ok(Self {
            config,
            storage,
            session,
            cache,
            api,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    fn require_token(&self) -> Result<(), PortalError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(PortalError::Unauthenticated)
        }
    }

    fn store_token(&mut self, token: String) -> Result<(), PortalError> {
        self.session.update(token.clone())?;
        self.api.set_token(Some(token));
        Ok(())
    }

    /// Forget the token after the backend rejected it.
    fn drop_rejected_token(&mut self) -> PortalError {
        warn!("Backend rejected session token, signing out");
        self.api.set_token(None);
        match self.session.clear() {
            Ok(()) => PortalError::Unauthenticated,
            Err(e) => e.into(),
        }
    }

    // =========================================================================
    // Member Flows
    // =========================================================================

    /// Sign in. A failed attempt leaves the session untouched.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Member, PortalError> {
        if self.session.is_authenticated() {
            return Err(PortalError::AlreadySignedIn);
        }
        if username.trim().is_empty() || password.is_empty() {
            return Err(PortalError::Validation("Username and password required".to_string()));
        }

        let auth = match self.api.authenticate(username.trim(), password).await {
            Ok(auth) => auth,
            Err(e) => {
                warn!(error = %e, "Login failed");
                return Err(e.into());
            }
        };

        self.store_token(auth.jwt)?;
        info!(user_id = auth.user.id, "Login successful");
        Ok(auth.user)
    }

    /// Submit a membership application.
    pub async fn register(&mut self, registration: &Registration) -> Result<RegistrationOutcome, PortalError> {
        if self.session.is_authenticated() {
            return Err(PortalError::AlreadySignedIn);
        }
        registration.check().map_err(PortalError::Validation)?;

        let response = self.api.register(registration).await?;
        let signed_in = match response.jwt {
            Some(jwt) => {
                self.store_token(jwt)?;
                true
            }
            None => false,
        };
        info!(user_id = response.user.id, signed_in, "Registration accepted");

        Ok(RegistrationOutcome {
            member: response.user,
            signed_in,
        })
    }

    pub fn logout(&mut self) -> Result<(), PortalError> {
        self.session.clear()?;
        self.api.set_token(None);
        info!("Logged out");
        Ok(())
    }

    /// Sign out and drop every cached entry, ending the storage scope.
    pub fn end_session(&mut self) -> Result<(), PortalError> {
        self.logout()?;
        self.storage.clear_all()?;
        Ok(())
    }

    /// The signed-in member's profile.
    pub async fn profile(&mut self) -> Result<Member, PortalError> {
        self.require_token()?;
        match self.api.fetch_me().await {
            Ok(member) => Ok(member),
            Err(ApiError::Unauthorized) => Err(self.drop_rejected_token()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save profile changes for member `id` and return the refreshed profile.
    pub async fn save_profile(&mut self, id: i64, update: &ProfileUpdate) -> Result<Member, PortalError> {
        self.require_token()?;
        match self.api.update_member(id, update).await {
            Ok(_) => {
                info!(user_id = id, "Profile updated");
                self.profile().await
            }
            Err(ApiError::Unauthorized) => Err(self.drop_rejected_token()),
            Err(e) => {
                warn!(user_id = id, error = %e, "Profile update failed");
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Public Content
    // =========================================================================

    /// Navigation menu, served from the cache while it is fresh.
    pub async fn navigation(&self) -> Result<Vec<NavigationItem>, PortalError> {
        match self.cache.get::<Vec<NavigationItem>>(NAVIGATION_CACHE_KEY) {
            Ok(Some(items)) => {
                debug!(count = items.len(), "Navigation served from cache");
                return Ok(items);
            }
            Ok(None) => {}
            Err(CacheError::Malformed { key, source }) => {
                warn!(key = %key, error = %source, "Discarding malformed cache entry");
                self.cache.remove(&key)?;
            }
            Err(e) => return Err(e.into()),
        }

        let items = self.api.fetch_navigation().await?;
        self.cache
            .set(NAVIGATION_CACHE_KEY, &items, self.config.navigation_ttl_minutes())?;
        Ok(items)
    }

    /// Content page at `/<slug>`; the empty slug is the home page.
    pub async fn page(&self, slug: &str) -> Result<Page, PortalError> {
        self.api
            .fetch_page(slug)
            .await?
            .ok_or_else(|| PortalError::PageNotFound(crate::models::page_link(slug)))
    }

    /// Navigation and page together, fetched concurrently.
    pub async fn landing(&self, slug: &str) -> Result<(Vec<NavigationItem>, Page), PortalError> {
        futures::try_join!(self.navigation(), self.page(slug))
    }
}
