//! Data directory resolution and `config.toml` loading.
//!
//! Layout under the base directory:
//!
//! ```text
//! ~/.clustermap/
//!   records.db    local mirror of processed_messages
//!   config.toml   pipeline and source settings (optional)
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cm_core::PipelineConfig;

use crate::error::{Result, StoreError};

/// Overrides the base directory when set.
pub const DATA_DIR_ENV: &str = "CM_DATA_DIR";

const DB_FILE: &str = "records.db";
const CONFIG_FILE: &str = "config.toml";

pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".clustermap")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    base: PathBuf,
}

impl DataDir {
    /// Explicit override first, then `CM_DATA_DIR`, then `~/.clustermap`.
    pub fn resolve(override_dir: Option<&Path>) -> Self {
        let base = override_dir
            .map(Path::to_path_buf)
            .or_else(|| env::var(DATA_DIR_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(default_base_dir);
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn db_path(&self) -> PathBuf {
        self.base.join(DB_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join(CONFIG_FILE)
    }
}

/// Where remote records come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Endpoint returning a JSON array of records.
    pub url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key_env: "CM_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!("loading config from {}", path.display());
                Self::from_toml_str(&text)
                    .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(StoreError::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }
}
