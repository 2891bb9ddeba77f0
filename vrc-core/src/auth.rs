//! Session credential supply.
//!
//! The event stream authenticates with the same session token the REST API
//! hands out as the `auth` cookie. Anything that can produce that token
//! implements [`CredentialSupplier`].

use crate::error::{VrcError, VrcResult};

/// Source of the session token used to open the event stream.
pub trait CredentialSupplier: Send + Sync {
    /// Return the current session token.
    ///
    /// A failure here means the caller must re-authenticate; the stream never
    /// retries it.
    fn session_token(&self) -> VrcResult<String>;
}

/// A fixed, already known session token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

impl CredentialSupplier for StaticToken {
    fn session_token(&self) -> VrcResult<String> {
        if self.0.trim().is_empty() {
            return Err(VrcError::MissingCredential("empty session token".into()));
        }
        Ok(self.0.clone())
    }
}

impl<T: CredentialSupplier + ?Sized> CredentialSupplier for std::sync::Arc<T> {
    fn session_token(&self) -> VrcResult<String> {
        (**self).session_token()
    }
}
