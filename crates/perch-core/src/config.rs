//! Perch configuration.
//!
//! Read from `perch.toml` in the working directory, falling back to
//! `$XDG_CONFIG_HOME/perch/config.toml` (or `~/.config/perch/config.toml`).
//! Every field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::marker::MarkerId;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "perch.toml";

/// Link attached to build statuses unless configured otherwise.
pub const DEFAULT_STATUS_URL: &str = "https://github.com/perch-dev/perch";

/// Display name of build statuses unless configured otherwise.
pub const DEFAULT_STATUS_NAME: &str = "Perch";

/// Build status settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    /// Status key; defaults to the marker id.
    pub key: Option<String>,
    /// Display name.
    pub name: String,
    /// Link shown with the status.
    pub url: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            key: None,
            name: DEFAULT_STATUS_NAME.to_string(),
            url: DEFAULT_STATUS_URL.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bitbucket API base URL.
    pub api_url: Option<String>,

    /// Marker id distinguishing this run's comments.
    pub marker_id: Option<MarkerId>,

    /// Build status settings.
    pub status: StatusConfig,
}

impl Config {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or has unknown keys.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Load the first config file found for `dir`, or the defaults.
    ///
    /// # Errors
    /// Returns error if a found file cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Self> {
        for path in Self::candidates(dir) {
            if path.is_file() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn candidates(dir: &Path) -> Vec<PathBuf> {
        let mut paths = vec![dir.join(CONFIG_FILE)];

        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
        if let Some(config_home) = config_home {
            paths.push(config_home.join("perch").join("config.toml"));
        }

        paths
    }

    /// Marker id to use, falling back to the default id.
    #[must_use]
    pub fn marker_id(&self) -> MarkerId {
        self.marker_id.clone().unwrap_or_default()
    }

    /// Build status key to use.
    #[must_use]
    pub fn status_key(&self) -> String {
        self.status
            .key
            .clone()
            .unwrap_or_else(|| self.marker_id().to_string())
    }
}
