//! Replica configuration via `roomq.toml`
//!
//! A persistent storage directory carries a `roomq.toml`. On first open a
//! commented default is written; to change settings, edit the file. An
//! ephemeral directory always runs with defaults.

use std::path::{Path, PathBuf};

use roomq_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Config file name placed in the storage directory.
pub const CONFIG_FILE_NAME: &str = "roomq.toml";

/// Announcement directory used when none is configured.
pub const DEFAULT_DISCOVERY_DIR_NAME: &str = "roomq-discovery";

fn default_listen_addr() -> String {
    "127.0.0.1:0".to_string()
}

/// Replica configuration loaded from `roomq.toml`.
///
/// # Example
///
/// ```toml
/// listen_addr = "127.0.0.1:0"
/// # discovery_dir = "/var/run/roomq-discovery"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaConfig {
    /// Address the replication listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Directory holding peer announcements, shared by every session on the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_dir: Option<PathBuf>,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            discovery_dir: None,
        }
    }
}

impl ReplicaConfig {
    /// Announcement directory, falling back to one under the system temp dir.
    pub fn discovery_dir(&self) -> PathBuf {
        self.discovery_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DISCOVERY_DIR_NAME))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# roomq replica configuration
#
# Address the replication listener binds to. Port 0 picks a free port.
listen_addr = "127.0.0.1:0"

# Directory holding peer announcements. Sessions that should find each other
# must share it. Defaults to a "roomq-discovery" directory under the system
# temp dir.
# discovery_dir = "/var/run/roomq-discovery"
"#
    }

    /// Load the config for a storage directory.
    ///
    /// Ephemeral directories use defaults; persistent ones get a default
    /// file written on first use and are then read from it.
    pub fn load(storage: &Path, ephemeral: bool) -> Result<Self> {
        if ephemeral {
            return Ok(Self::default());
        }
        let path = storage.join(CONFIG_FILE_NAME);
        Self::write_default_if_missing(&path)?;
        Self::from_file(&path)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns a session error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::session(
                "config",
                format!("Failed to read config file '{}': {}", path.display(), e),
            )
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::session(
                "config",
                format!("Failed to parse config file '{}': {}", path.display(), e),
            )
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::session(
                    "config",
                    format!(
                        "Failed to write default config file '{}': {}",
                        path.display(),
                        e
                    ),
                )
            })?;
        }
        Ok(())
    }
}
