//! Where the client keeps its config file, saved session, and logs.
//!
//! By default files live in the per-user config and data directories. Setting
//! `VRCHAT_RS_HOME` puts everything under that one directory instead, which
//! keeps several accounts apart and keeps tests out of the real home.

use std::path::{Path, PathBuf};

use crate::constants::{APP_NAME, CONFIG_FILE_NAME, HOME_ENV, LOG_DIR_NAME, SESSION_FILE_NAME};
use crate::error::{VrcError, VrcResult};

/// Resolved file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    /// `VRCHAT_RS_HOME` if set, otherwise the per-user directories.
    pub fn resolve() -> VrcResult<Self> {
        match std::env::var_os(HOME_ENV).filter(|home| !home.is_empty()) {
            Some(home) => Ok(Self::rooted(home)),
            None => Self::per_user(),
        }
    }

    /// Keep everything under `root`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: root.clone(),
            data_dir: root,
        }
    }

    fn per_user() -> VrcResult<Self> {
        let config = dirs::config_dir()
            .ok_or_else(|| VrcError::Config("could not determine config directory".into()))?;
        let data = dirs::data_dir()
            .ok_or_else(|| VrcError::Config("could not determine data directory".into()))?;
        Ok(Self {
            config_dir: config.join(APP_NAME),
            data_dir: data.join(APP_NAME),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Cookies saved by `login --save`.
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }
}
