//! # Auth Session
//!
//! Holds the current [`Identity`] and broadcasts changes to it. The
//! [`ActorConnection`](crate::connection::ActorConnection) subscribes and rebuilds the backend
//! client whenever the identity changes.

use super::store::{MemorySessionStore, SessionError, SessionStore, StoredSession};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// The signed-in user, identified by email.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn email(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cloneable handle to the session; all clones share one identity channel.
#[derive(Clone)]
pub struct AuthSession {
    store: Arc<dyn SessionStore>,
    identity: Arc<watch::Sender<Option<Identity>>>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("identity", &*self.identity.borrow())
            .finish()
    }
}

impl AuthSession {
    /// Signed-out session over `store`. The store is not read.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            store,
            identity: Arc::new(identity),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Rebuilds the session from whatever `store` persisted.
    pub fn restore(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        let restored = match store.load()? {
            Some(StoredSession {
                is_authenticated: true,
                user_email: Some(email),
            }) => Some(Identity::new(email)),
            _ => None,
        };
        if let Some(identity) = &restored {
            info!(%identity, "Restored session");
        }
        let (identity, _) = watch::channel(restored);
        Ok(Self {
            store,
            identity: Arc::new(identity),
        })
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    /// Persists and publishes `email` as the signed-in identity.
    ///
    /// Subscribers are only notified when the identity actually changes.
    pub fn login(&self, email: impl Into<String>) -> Result<(), SessionError> {
        let identity = Identity::new(email);
        self.store.save(&StoredSession::signed_in(identity.email()))?;
        info!(%identity, "Logged in");
        self.publish(Some(identity));
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.store.clear()?;
        info!("Logged out");
        self.publish(None);
        Ok(())
    }

    fn publish(&self, next: Option<Identity>) {
        self.identity.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
