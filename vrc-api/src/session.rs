//! Session persistence.
//!
//! Saves the API cookies (the `auth` session and the `twoFactorAuth`
//! remember-me cookie) to a JSON file so later runs can skip the login.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vrc_core::error::{VrcError, VrcResult};

use crate::client::ApiClient;

/// On-disk session file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
}

/// One saved cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
}

impl ApiClient {
    /// Write the current cookies to `path`, readable by the owner only.
    pub fn save_session(&self, path: &Path) -> VrcResult<()> {
        let cookies: Vec<StoredCookie> = self
            .cookie_pairs()
            .into_iter()
            .map(|(name, value)| StoredCookie { name, value })
            .collect();
        if cookies.is_empty() {
            return Err(VrcError::MissingCredential("no cookies to save".into()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&SessionFile { cookies })?;
        std::fs::write(path, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        info!("session saved to {}", path.display());
        Ok(())
    }

    /// Load cookies saved by [`save_session`](Self::save_session).
    pub fn load_session(&self, path: &Path) -> VrcResult<()> {
        let contents = std::fs::read_to_string(path)?;
        let file: SessionFile = serde_json::from_str(&contents)?;
        for cookie in &file.cookies {
            self.add_cookie(&cookie.name, &cookie.value);
        }
        debug!("loaded {} cookies from {}", file.cookies.len(), path.display());
        Ok(())
    }
}
