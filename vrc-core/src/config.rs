//! Client configuration management.
//!
//! Handles loading, saving, and accessing configuration for the REST API
//! client, the pipeline event stream, and logging. Configuration is persisted
//! as TOML on disk; every field has a default so partial files are valid.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{VrcError, VrcResult};
use crate::paths::AppPaths;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Pipeline event stream settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL including the version path.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// User-Agent sent with every request. VRChat rejects requests without one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub timeout_ms: u64,
}

/// What the stream does when the server rejects the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthFailurePolicy {
    /// Stop reconnecting and close the client.
    #[default]
    Stop,
    /// Treat the rejection like any other transient failure.
    Retry,
}

/// Pipeline event stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// WebSocket endpoint of the pipeline service.
    #[serde(default = "default_stream_endpoint")]
    pub endpoint: String,

    /// User-Agent sent on the opening handshake.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound on the reconnect delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Factor applied to the delay after each failed dial.
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,

    /// Handshake timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Number of tasks running subscriber callbacks.
    #[serde(default = "default_dispatch_workers")]
    pub dispatch_workers: usize,

    /// Pending callback invocations buffered before backpressure applies.
    #[serde(default = "default_dispatch_queue_capacity")]
    pub dispatch_queue_capacity: usize,

    /// How long the reader waits for queue space before dropping an invocation.
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_ms: u64,

    /// Reaction to a rejected session token.
    #[serde(default)]
    pub auth_failure_policy: AuthFailurePolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_api_base_url() -> String {
    constants::DEFAULT_API_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    constants::DEFAULT_USER_AGENT.to_string()
}

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_MS
}

fn default_stream_endpoint() -> String {
    constants::PIPELINE_URL.to_string()
}

fn default_base_delay() -> u64 {
    constants::RECONNECT_BASE_DELAY_MS
}

fn default_max_delay() -> u64 {
    constants::RECONNECT_MAX_DELAY_MS
}

fn default_multiplier() -> u32 {
    constants::RECONNECT_MULTIPLIER
}

fn default_connect_timeout() -> u64 {
    30_000
}

fn default_dispatch_workers() -> usize {
    8
}

fn default_dispatch_queue_capacity() -> usize {
    1024
}

fn default_dispatch_timeout() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_api_timeout(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: default_stream_endpoint(),
            user_agent: default_user_agent(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            connect_timeout_ms: default_connect_timeout(),
            dispatch_workers: default_dispatch_workers(),
            dispatch_queue_capacity: default_dispatch_queue_capacity(),
            dispatch_timeout_ms: default_dispatch_timeout(),
            auth_failure_policy: AuthFailurePolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl StreamConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    /// Reject settings the stream cannot run with.
    pub fn validate(&self) -> VrcResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(VrcError::MissingConfig("stream.endpoint".into()));
        }
        if self.base_delay_ms == 0 {
            return Err(VrcError::Config("stream.base_delay_ms must be positive".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(VrcError::Config(
                "stream.max_delay_ms must not be below stream.base_delay_ms".into(),
            ));
        }
        if self.multiplier == 0 {
            return Err(VrcError::Config("stream.multiplier must be at least 1".into()));
        }
        if self.dispatch_workers == 0 || self.dispatch_queue_capacity == 0 {
            return Err(VrcError::Config(
                "stream.dispatch_workers and stream.dispatch_queue_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> VrcResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> VrcResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| VrcError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> VrcResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The configured log directory, or the default one under `paths`.
    pub fn effective_log_dir(&self, paths: &AppPaths) -> PathBuf {
        if self.logging.directory.is_empty() {
            paths.log_dir()
        } else {
            PathBuf::from(&self.logging.directory)
        }
    }
}

/// Thread-safe configuration holder for shared access across commands.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }
}
