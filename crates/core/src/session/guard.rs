use std::{fmt, future::Future, sync::Arc};

use parking_lot::RwLock;
use tracing::{info, warn};

use super::store::{MemoryTokenStore, TokenStore};
use crate::error::ApiError;

/// Exchanges credentials for a bearer token.
pub trait Authenticator {
    /// Log in, returning the access token on success.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;
}

/// Shared handle to the current bearer token.
///
/// Cloning is cheap and every clone observes the same token. The token lives
/// in memory and in a [`TokenStore`] so it survives restarts.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<Inner>,
}

struct Inner {
    token: RwLock<Option<String>>,
    store: Box<dyn TokenStore>,
}

impl SessionGuard {
    /// Build a guard, restoring any token persisted in `store`.
    ///
    /// An unreadable store starts the session logged out.
    pub fn restore(store: impl TokenStore + 'static) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(err) => {
                warn!(?err, "could not restore session, starting logged out");
                None
            }
        };
        if token.is_some() {
            info!("restored persisted session");
        }
        Self {
            inner: Arc::new(Inner {
                token: RwLock::new(token),
                store: Box::new(store),
            }),
        }
    }

    /// Guard that only keeps the token in memory.
    pub fn ephemeral() -> Self {
        Self::restore(MemoryTokenStore::new())
    }

    /// Current bearer token.
    pub fn token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    /// Whether a token is present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.token.read().is_some()
    }

    /// Authenticate and store the resulting token.
    ///
    /// On failure the session is left untouched and the error returned.
    pub async fn login<A>(&self, auth: &A, username: &str, password: &str) -> Result<(), ApiError>
    where
        A: Authenticator + Sync,
    {
        let token = auth.login(username, password).await?;
        self.set_token(token);
        info!(username, "logged in");
        Ok(())
    }

    /// Install a token obtained elsewhere.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        if let Err(err) = self.inner.store.save(&token) {
            warn!(?err, "failed to persist session token");
        }
        *self.inner.token.write() = Some(token);
    }

    /// Explicit logout: forget the token everywhere.
    pub fn logout(&self) -> anyhow::Result<()> {
        self.inner.token.write().take();
        info!("logged out");
        self.inner.store.clear()
    }

    /// Logout triggered by an authorization failure.
    pub fn expire(&self) {
        if self.inner.token.write().take().is_some() {
            warn!("session expired, logging out");
        }
        if let Err(err) = self.inner.store.clear() {
            warn!(?err, "failed to clear persisted session");
        }
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
