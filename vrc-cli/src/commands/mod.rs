//! CLI command implementations.

pub mod config;
pub mod listen;
pub mod login;

use std::path::PathBuf;

use clap::Args;
use dialoguer::{Input, Password};

use vrc_api::{ApiClient, Credentials};
use vrc_core::config::ConfigHandle;
use vrc_core::error::{VrcError, VrcResult};
use vrc_core::paths::AppPaths;

/// Login flags shared by the commands that need a session.
#[derive(Args, Debug, Default)]
pub struct LoginArgs {
    /// Account username or email.
    #[arg(short, long, env = "VRCHAT_USERNAME")]
    pub username: Option<String>,
    /// Account password.
    #[arg(short, long, env = "VRCHAT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Current TOTP code for accounts with two-factor authentication.
    #[arg(long, env = "VRCHAT_TOTP_CODE", hide_env_values = true)]
    pub totp: Option<String>,
}

/// Helper to create an API client from config.
pub async fn create_api_client(config: &ConfigHandle) -> VrcResult<ApiClient> {
    let api_config = config.read().await.api.clone();
    ApiClient::new(&api_config)
}

/// Where `login --save` keeps the session cookies.
pub fn session_path() -> VrcResult<PathBuf> {
    Ok(AppPaths::resolve()?.session_file())
}

/// Resolve credentials: flag or env var first, then an interactive prompt.
pub fn resolve_credentials(args: LoginArgs) -> VrcResult<Credentials> {
    let username = match non_empty(args.username) {
        Some(u) => u,
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .map_err(|e| VrcError::Internal(e.to_string()))?,
    };
    let password = match non_empty(args.password) {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| VrcError::Internal(e.to_string()))?,
    };
    let mut creds = Credentials::new(username, password);
    if let Some(code) = non_empty(args.totp) {
        creds = creds.with_totp(code);
    }
    Ok(creds)
}

/// Log in, asking for a TOTP code when the account needs one and none was given.
pub async fn authenticate_interactive(api: &ApiClient, args: LoginArgs) -> VrcResult<vrc_models::CurrentUser> {
    let creds = resolve_credentials(args)?;
    match api.authenticate(&creds).await {
        Err(VrcError::TwoFactorRequired(methods)) if creds.totp.is_none() => {
            let code: String = Input::new()
                .with_prompt(format!("Two-factor code ({})", methods.join(", ")))
                .interact_text()
                .map_err(|e| VrcError::Internal(e.to_string()))?;
            api.authenticate(&creds.with_totp(code)).await
        }
        other => other,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Truncate a string to a maximum length, appending an ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
