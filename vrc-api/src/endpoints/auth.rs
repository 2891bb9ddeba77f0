//! Authentication endpoints.

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use vrc_core::error::{VrcError, VrcResult};
use vrc_models::CurrentUser;

use crate::client::{ApiClient, BasicAuth};
use crate::response::{SuccessResponse, VerifyTwoFactorResponse};

/// Login credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Current TOTP code, needed only when the account has 2FA enabled.
    pub totp: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            totp: None,
        }
    }

    pub fn with_totp(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.totp = if code.trim().is_empty() { None } else { Some(code) };
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("totp", &self.totp.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ApiClient {
    /// Log in with username and password, completing TOTP 2FA when the
    /// account requires it.
    ///
    /// On success the session cookie is held in the client's jar and the
    /// logged-in user is returned.
    pub async fn authenticate(&self, credentials: &Credentials) -> VrcResult<CurrentUser> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(VrcError::MissingCredential(
                "username and password are required".into(),
            ));
        }

        let basic = BasicAuth {
            username: &credentials.username,
            password: &credentials.password,
        };
        let resp = self
            .request_with_retry(Method::GET, "/auth/user", None, Some(&basic))
            .await?;
        let user: CurrentUser = Self::parse_json(resp).await?;

        if !user.needs_two_factor() {
            info!("authenticated as {}", user.display_name);
            return Ok(user);
        }

        debug!(
            "two-factor authentication required: {:?}",
            user.requires_two_factor_auth
        );
        let Some(code) = credentials.totp.as_deref() else {
            return Err(VrcError::TwoFactorRequired(user.requires_two_factor_auth));
        };
        self.verify_totp(code).await?;

        let user = self.current_user().await?;
        info!("authenticated as {} (2fa)", user.display_name);
        Ok(user)
    }

    /// Submit a TOTP code for the pending login.
    pub async fn verify_totp(&self, code: &str) -> VrcResult<()> {
        let resp: VerifyTwoFactorResponse = self
            .post_json("/auth/twofactorauth/totp/verify", &json!({ "code": code.trim() }))
            .await?;
        if !resp.verified {
            return Err(VrcError::AuthFailed(
                "two-factor authentication code invalid".into(),
            ));
        }
        Ok(())
    }

    /// Fetch the logged-in user for the current session.
    pub async fn current_user(&self) -> VrcResult<CurrentUser> {
        let user: CurrentUser = self.get_json("/auth/user").await?;
        if user.needs_two_factor() {
            return Err(VrcError::TwoFactorRequired(user.requires_two_factor_auth));
        }
        Ok(user)
    }

    /// End the session on the server and forget the local cookie.
    pub async fn logout(&self) -> VrcResult<()> {
        let resp = self.put("/logout", None).await?;
        let ack: SuccessResponse = Self::parse_json(resp).await.unwrap_or_default();
        debug!("logout: {}", ack.success.message);
        self.clear_session();
        Ok(())
    }
}
