//! API response types.
//!
//! Failed VRChat API calls carry an error envelope:
//! ```json
//! { "error": { "message": "\"Invalid Username/Email or Password\"", "status_code": 401 } }
//! ```

use serde::{Deserialize, Serialize};

/// Error envelope returned with 4xx/5xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: ApiErrorDetail,
}

/// Error detail inside [`ApiErrorBody`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_code: u16,
}

impl ApiErrorBody {
    /// Extract the error message from a response body, if it has one.
    ///
    /// The API sometimes wraps the message in an extra pair of quotes; those
    /// are stripped.
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
        let message = parsed.error.message.trim().trim_matches('"').to_string();
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

/// Response of `POST /auth/twofactorauth/totp/verify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyTwoFactorResponse {
    #[serde(default)]
    pub verified: bool,
}

/// Response of `PUT /logout` and other acknowledgement endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: SuccessDetail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuccessDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status_code: u16,
}
