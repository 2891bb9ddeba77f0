//! VRChat API - HTTP client for the VRChat REST API.
//!
//! Covers login (basic auth plus TOTP two-factor), the current user, and
//! logout. The session cookie the API hands out is kept in the client's
//! cookie jar and exposed as the credential the event stream connects with.

pub mod client;
pub mod endpoints;
pub mod response;
pub mod session;

// Re-export key types
pub use client::{ApiClient, RetryConfig};
pub use endpoints::auth::Credentials;
pub use response::{ApiErrorBody, SuccessResponse, VerifyTwoFactorResponse};
pub use session::{SessionFile, StoredCookie};
