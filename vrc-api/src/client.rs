//! HTTP client for the VRChat REST API.
//!
//! Handles the session cookie jar, the mandatory User-Agent, timeouts,
//! exponential backoff retry, and mapping of error responses.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use vrc_core::auth::CredentialSupplier;
use vrc_core::config::ApiConfig;
use vrc_core::constants::AUTH_COOKIE_NAMES;
use vrc_core::error::{VrcError, VrcResult};

use crate::response::ApiErrorBody;

/// Retry configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// HTTP status codes that trigger a retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

/// Basic auth credentials attached to a single request.
pub(crate) struct BasicAuth<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

/// HTTP client for the VRChat API.
///
/// Cookies set by the API (notably the `auth` session cookie) are kept in an
/// in-memory jar shared by all clones of this client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Client,
    /// Base URL including the version path (e.g. "https://api.vrchat.cloud/api/1").
    base_url: Url,
    /// Cookie jar backing the session.
    jar: Arc<Jar>,
    /// Default request timeout.
    timeout: Duration,
    /// Retry configuration.
    retry_config: RetryConfig,
}

impl ApiClient {
    /// Create a new ApiClient from API configuration.
    pub fn new(config: &ApiConfig) -> VrcResult<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| VrcError::Config(format!("invalid api base url {}: {e}", config.base_url)))?;
        if config.user_agent.trim().is_empty() {
            return Err(VrcError::MissingConfig("api.user_agent".into()));
        }

        let jar = Arc::new(Jar::default());
        let inner = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(15))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| VrcError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url,
            jar,
            timeout: config.timeout(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Set custom retry configuration.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    // --- Session ---

    /// Use an existing session token instead of logging in.
    pub fn set_session_token(&self, token: &str) {
        self.add_cookie(AUTH_COOKIE_NAMES[0], token.trim());
        debug!("session token installed");
    }

    /// Put a cookie into the jar for the API host.
    pub(crate) fn add_cookie(&self, name: &str, value: &str) {
        let cookie = format!("{name}={value}; Path=/");
        self.jar.add_cookie_str(&cookie, &self.base_url);
    }

    /// `name=value` pairs the jar would send to the API.
    pub(crate) fn cookie_pairs(&self) -> Vec<(String, String)> {
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return Vec::new();
        };
        header
            .to_str()
            .unwrap_or_default()
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Drop the session cookie from the jar.
    pub(crate) fn clear_session(&self) {
        for name in AUTH_COOKIE_NAMES {
            let cookie = format!("{name}=; Path=/; Max-Age=0");
            self.jar.add_cookie_str(&cookie, &self.base_url);
        }
    }

    /// The current session token, read from the cookie jar.
    pub fn session_token(&self) -> VrcResult<String> {
        find_session_cookie(&self.cookie_pairs())
            .ok_or_else(|| VrcError::MissingCredential("no auth cookie; log in first".into()))
    }

    /// Whether a session token is present.
    pub fn has_session(&self) -> bool {
        self.session_token().is_ok()
    }

    // --- Requests ---

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        basic: Option<&BasicAuth<'_>>,
    ) -> RequestBuilder {
        let mut builder = self.inner.request(method, url).timeout(self.timeout);
        if let Some(b) = body {
            builder = builder.json(b);
        }
        if let Some(auth) = basic {
            builder = builder.basic_auth(auth.username, Some(auth.password));
        }
        builder
    }

    /// Execute a request with exponential backoff retry.
    pub(crate) async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        basic: Option<&BasicAuth<'_>>,
    ) -> VrcResult<Response> {
        let url = self.url(path);
        debug!("{} {}", method, path);

        let mut last_error: Option<VrcError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_retry_delay(attempt - 1);
                warn!(
                    "retrying {} {} (attempt {}/{}) after {:.1}s",
                    method,
                    path,
                    attempt + 1,
                    self.retry_config.max_retries + 1,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            let builder = self.build_request(method.clone(), &url, body, basic);

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();

                    if self
                        .retry_config
                        .retryable_statuses
                        .contains(&status.as_u16())
                        && attempt < self.retry_config.max_retries
                    {
                        warn!("retryable status {} from {}", status.as_u16(), path);
                        last_error = Some(VrcError::ServerError {
                            status: status.as_u16(),
                            message: format!("retryable status {status}"),
                        });
                        continue;
                    }

                    return Self::check_status(response).await;
                }
                Err(e) => {
                    let is_retryable = e.is_timeout() || e.is_connect();
                    let err = Self::classify_error(e);

                    if is_retryable && attempt < self.retry_config.max_retries {
                        warn!("retryable error on {}: {}", path, err);
                        last_error = Some(err);
                        continue;
                    }

                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| VrcError::Http("max retries exceeded".into())))
    }

    /// Calculate retry delay with exponential backoff.
    fn calculate_retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.retry_config.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(32));
        let max_ms = self.retry_config.max_delay.as_millis() as u64;
        Duration::from_millis(delay_ms.min(max_ms))
    }

    /// Execute a GET request with automatic retry.
    pub async fn get(&self, path: &str) -> VrcResult<Response> {
        self.request_with_retry(Method::GET, path, None, None).await
    }

    /// Execute a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> VrcResult<Response> {
        self.request_with_retry(Method::POST, path, Some(body), None)
            .await
    }

    /// Execute a PUT request, with an optional JSON body.
    pub async fn put(&self, path: &str, body: Option<&serde_json::Value>) -> VrcResult<Response> {
        self.request_with_retry(Method::PUT, path, body, None).await
    }

    /// Deserialize a JSON response body.
    pub async fn parse_json<T: DeserializeOwned>(response: Response) -> VrcResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| VrcError::Serialization(format!("failed to parse response: {e}")))
    }

    /// Convenience: GET + parse.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> VrcResult<T> {
        let resp = self.get(path).await?;
        Self::parse_json(resp).await
    }

    /// Convenience: POST + parse.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> VrcResult<T> {
        let resp = self.post(path, body).await?;
        Self::parse_json(resp).await
    }

    /// Check the HTTP status code and convert to VrcError if needed.
    async fn check_status(response: Response) -> VrcResult<Response> {
        let status = response.status();
        if !status.is_client_error() && !status.is_server_error() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = ApiErrorBody::message_from(&body).unwrap_or_else(|| status.to_string());

        if status == StatusCode::UNAUTHORIZED {
            return Err(VrcError::AuthFailed(message));
        }
        Err(VrcError::ServerError {
            status: status.as_u16(),
            message,
        })
    }

    /// Classify a reqwest error into a VrcError variant.
    fn classify_error(e: reqwest::Error) -> VrcError {
        if e.is_timeout() {
            VrcError::Timeout(e.to_string())
        } else if e.is_connect() {
            VrcError::Http(format!("connection failed: {e}"))
        } else {
            VrcError::Http(e.to_string())
        }
    }
}

impl CredentialSupplier for ApiClient {
    fn session_token(&self) -> VrcResult<String> {
        ApiClient::session_token(self)
    }
}

/// Pick the session token out of the jar's cookies.
fn find_session_cookie(pairs: &[(String, String)]) -> Option<String> {
    pairs
        .iter()
        .find(|(name, value)| AUTH_COOKIE_NAMES.contains(&name.as_str()) && !value.is_empty())
        .map(|(_, value)| value.clone())
}
