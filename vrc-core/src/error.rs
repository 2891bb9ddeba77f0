//! Global error types for the VRChat client crates.
//!
//! Every fallible operation that crosses a crate boundary returns a
//! `VrcError`, with conversions from the underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using VrcError.
pub type VrcResult<T> = Result<T, VrcError>;

/// Unified error type covering all error categories in the client.
#[derive(Error, Debug)]
pub enum VrcError {
    // -- Configuration errors --
    /// Failed to load or parse configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    /// HTTP request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// The API returned an error response.
    #[error("vrchat api error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    // -- Authentication errors --
    /// Authentication was rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The account requires a second factor that was not supplied.
    #[error("two-factor authentication required (methods: {0:?})")]
    TwoFactorRequired(Vec<String>),

    /// No session credential is available to open the event stream.
    #[error("session credential unavailable: {0}")]
    MissingCredential(String),

    // -- Stream errors --
    /// The event stream could not be established.
    #[error("stream error: {0}")]
    Stream(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VrcError {
    /// Whether this error means the session is no longer valid and the
    /// caller has to re-authenticate out of band.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::AuthFailed(_) | Self::TwoFactorRequired(_) | Self::MissingCredential(_) => true,
            Self::ServerError { status, .. } => *status == 401,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for VrcError {
    fn from(e: serde_json::Error) -> Self {
        VrcError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for VrcError {
    fn from(e: toml::de::Error) -> Self {
        VrcError::Config(e.to_string())
    }
}
