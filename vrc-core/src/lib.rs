//! VRChat Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other client crates:
//! - Configuration for the REST API, the event stream, and logging
//! - Global error types covering all error categories
//! - The session credential abstraction consumed by the event stream
//! - Structured logging with tracing
//! - Common constants and file locations

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod paths;

// Re-export commonly used items at the crate root
pub use auth::{CredentialSupplier, StaticToken};
pub use config::{AppConfig, AuthFailurePolicy, StreamConfig};
pub use error::{VrcError, VrcResult};
pub use logging::{init_logging, LogOptions};
pub use paths::AppPaths;
