//! Session token storage.
//!
//! The token returned by login is echoed on every later request. Clones of a
//! [`SessionToken`] share the same slot, so every client built on one
//! [`ServiceClient`](crate::client::ServiceClient) sees the token as soon as it is stored.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Header carrying the session token.
pub const SESSION_HEADER: &str = "x-xsrf-token";

/// Shared, redacted session token slot.
#[derive(Clone, Default)]
pub struct SessionToken {
    inner: Arc<RwLock<Option<SecretString>>>,
}

impl SessionToken {
    /// Create an empty (unauthenticated) slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot that already holds a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set(token);
        session
    }

    /// Store a token. An empty token clears the slot.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = if token.is_empty() {
            None
        } else {
            Some(SecretString::from(token))
        };
    }

    /// Forget the stored token.
    pub fn clear(&self) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Whether a token is stored.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Token value to send in [`SESSION_HEADER`], if any.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| token.expose_secret().to_string())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("authenticated", &self.is_set())
            .finish()
    }
}
