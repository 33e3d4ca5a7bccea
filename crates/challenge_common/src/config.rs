//! Challenge configuration.
//!
//! Config file: `$CHALLENGE_CONFIG`, else `~/.config/simpsonspedia/challenge.toml`.
//! Every field has a default, so a partial (or absent) file is fine.

use crate::error::ChallengeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "CHALLENGE_CONFIG";

const APP_DIR: &str = "simpsonspedia";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Directory holding the progress records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Namespace prepended to every record name
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// How long the celebration signal stays up
    #[serde(default = "default_celebration_ms")]
    pub celebration_ms: u64,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_key_prefix() -> String {
    format!("{}-", APP_DIR)
}

fn default_celebration_ms() -> u64 {
    3000
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            key_prefix: default_key_prefix(),
            celebration_ms: default_celebration_ms(),
        }
    }
}

impl ChallengeConfig {
    /// Default user config path: ~/.config/simpsonspedia/challenge.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("challenge.toml"))
    }

    /// Load configuration.
    ///
    /// Priority:
    /// 1. `$CHALLENGE_CONFIG`
    /// 2. User config
    /// 3. Defaults
    pub fn load() -> Result<Self, ChallengeError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from_path(Path::new(&path));
        }

        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => {
                debug!("No challenge config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ChallengeError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ChallengeError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
            .map_err(|e| ChallengeError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn celebration_window(&self) -> Duration {
        Duration::from_millis(self.celebration_ms)
    }
}
