//! Authentication seam and session state
//!
//! An [`Authenticator`] talks to the auth backend. A [`Session`] caches the
//! token it hands out and serializes refreshes, so any number of concurrent
//! workers trigger at most one re-authentication per expired token.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::error::Result;

/// Tokens this close to expiry are treated as expired
const EXPIRY_SKEW: SignedDuration = SignedDuration::from_secs(30);

/// Token and storage endpoint handed out by the auth backend
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub storage_url: Url,
    pub expires_at: Option<Timestamp>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, storage_url: Url) -> Self {
        Self {
            token: token.into(),
            storage_url,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    fn is_fresh(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(at) => now.checked_add(EXPIRY_SKEW).map(|t| t < at).unwrap_or(false),
            None => true,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("storage_url", &self.storage_url.as_str())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Obtains credentials from the authentication backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Fails with `Error::AuthenticationFailed` when the backend rejects us
    async fn authenticate(&self) -> Result<Credentials>;
}

/// Observable lifecycle of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Expired,
    Reauthenticating,
}

#[derive(Debug)]
enum Slot {
    Empty,
    Valid(Credentials),
    Expired,
}

/// Explicit authentication session shared by every operation
pub struct Session {
    authenticator: Arc<dyn Authenticator>,
    slot: RwLock<Slot>,
    refresh_guard: Mutex<()>,
}

impl Session {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            slot: RwLock::new(Slot::Empty),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Session seeded with credentials obtained elsewhere
    pub fn with_credentials(authenticator: Arc<dyn Authenticator>, credentials: Credentials) -> Self {
        Self {
            authenticator,
            slot: RwLock::new(Slot::Valid(credentials)),
            refresh_guard: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> SessionState {
        // The guard is held exactly while a refresh is in flight
        if self.refresh_guard.try_lock().is_err() {
            return SessionState::Reauthenticating;
        }
        match &*self.slot.read().await {
            Slot::Empty => SessionState::Unauthenticated,
            Slot::Valid(c) if c.is_fresh(Timestamp::now()) => SessionState::Authenticated,
            Slot::Valid(_) | Slot::Expired => SessionState::Expired,
        }
    }

    /// Valid credentials, authenticating first if needed
    pub async fn credentials(&self) -> Result<Credentials> {
        if let Some(credentials) = self.current().await {
            return Ok(credentials);
        }
        self.refresh_after(None).await
    }

    /// Force a new token
    pub async fn refresh(&self) -> Result<Credentials> {
        let stale = self.current().await.map(|c| c.token);
        self.refresh_after(stale.as_deref()).await
    }

    /// Replace `stale_token`, unless another caller already did
    ///
    /// Called by operations that received 401 for `stale_token`.
    pub async fn refresh_if_current(&self, stale_token: &str) -> Result<Credentials> {
        self.refresh_after(Some(stale_token)).await
    }

    /// Mark the cached token unusable; the next call re-authenticates
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        if matches!(*slot, Slot::Valid(_)) {
            *slot = Slot::Expired;
        }
    }

    async fn current(&self) -> Option<Credentials> {
        match &*self.slot.read().await {
            Slot::Valid(c) if c.is_fresh(Timestamp::now()) => Some(c.clone()),
            _ => None,
        }
    }

    async fn refresh_after(&self, stale_token: Option<&str>) -> Result<Credentials> {
        let _guard = self.refresh_guard.lock().await;

        // Someone else may have refreshed while we waited for the guard
        if let Some(current) = self.current().await {
            let replaced = match stale_token {
                Some(stale) => current.token != stale,
                None => true,
            };
            if replaced {
                return Ok(current);
            }
        }

        // The token being replaced is no longer handed out, even if this
        // refresh is dropped before it completes
        {
            let mut slot = self.slot.write().await;
            if matches!(*slot, Slot::Valid(_)) {
                *slot = Slot::Expired;
            }
        }
        tracing::debug!("authenticating");

        match self.authenticator.authenticate().await {
            Ok(credentials) => {
                *self.slot.write().await = Slot::Valid(credentials.clone());
                Ok(credentials)
            }
            Err(e) => {
                tracing::warn!(error = %e, "authentication failed");
                *self.slot.write().await = Slot::Expired;
                Err(e)
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
