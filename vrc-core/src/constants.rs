//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "vrchat-rs";

/// Environment variable that moves every file under one directory.
pub const HOME_ENV: &str = "VRCHAT_RS_HOME";

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const SESSION_FILE_NAME: &str = "session.json";

pub const LOG_DIR_NAME: &str = "logs";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.vrchat.cloud/api/1";

/// Default User-Agent for REST calls and the stream handshake.
pub const DEFAULT_USER_AGENT: &str = concat!("vrchat-rs/", env!("CARGO_PKG_VERSION"));

/// Default REST API timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 60_000;

/// Pipeline WebSocket endpoint.
pub const PIPELINE_URL: &str = "wss://pipeline.vrchat.cloud/";

/// Query parameter carrying the session token on the stream handshake.
pub const AUTH_TOKEN_PARAM: &str = "authToken";

/// Cookie names the API uses for the session token.
pub const AUTH_COOKIE_NAMES: &[&str] = &["auth", "authcookie"];

/// First reconnect delay in milliseconds.
pub const RECONNECT_BASE_DELAY_MS: u64 = 5_000;

/// Reconnect delay cap in milliseconds.
pub const RECONNECT_MAX_DELAY_MS: u64 = 60_000;

/// Reconnect delay growth factor.
pub const RECONNECT_MULTIPLIER: u32 = 2;

/// Subscription tag that matches every event.
pub const WILDCARD_EVENT: &str = "*";
