//! Error types of the event stream.
//!
//! Only dial failures during [`StreamClient::connect`](crate::StreamClient::connect)
//! reach the caller as a `VrcError`; everything that happens after the stream
//! is running is reported as a [`StreamError`] to the observer and the log.

use thiserror::Error;
use vrc_core::error::VrcError;

/// Failure to establish the WebSocket connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialError {
    /// The handshake was refused because the session token is not accepted.
    #[error("handshake rejected with status {status}: session token not accepted")]
    Unauthorized { status: u16 },

    /// The handshake was refused for another reason.
    #[error("handshake rejected with status {status}")]
    Rejected { status: u16 },

    /// The handshake did not complete in time.
    #[error("handshake timed out")]
    Timeout,

    /// IO, TLS, or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint URL or a handshake header is malformed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl DialError {
    /// Whether retrying the same dial can never succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::InvalidEndpoint(_))
    }

    /// Whether the server rejected the session token.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<DialError> for VrcError {
    fn from(e: DialError) -> Self {
        match e {
            DialError::Unauthorized { .. } => VrcError::AuthFailed(e.to_string()),
            DialError::Timeout => VrcError::Timeout(e.to_string()),
            DialError::InvalidEndpoint(_) => VrcError::Config(e.to_string()),
            DialError::Rejected { .. } | DialError::Network(_) => VrcError::Stream(e.to_string()),
        }
    }
}

/// Failure to decode a frame or a payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The frame is not a `{type, content}` envelope.
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The `content` string does not decode into the expected payload.
    #[error("malformed {event_type} payload: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A failure observed while the stream is running.
#[derive(Error, Debug)]
pub enum StreamError {
    /// A reconnect attempt failed.
    #[error("reconnect failed: {0}")]
    Dial(#[from] DialError),

    /// The connection broke while reading.
    #[error("connection lost: {0}")]
    Read(String),

    /// A frame or payload could not be decoded and was dropped.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A callback invocation was dropped because the dispatch queue stayed full.
    #[error("dispatch queue full, dropped {event_type} delivery")]
    DispatchOverflow { event_type: String },

    /// A subscriber callback panicked.
    #[error("handler for {event_type} panicked")]
    HandlerPanicked { event_type: String },

    /// The close frame could not be sent during shutdown.
    #[error("close handshake failed: {0}")]
    Close(String),
}
