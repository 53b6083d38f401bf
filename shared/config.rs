//! Service configuration, read from an optional TOML file.
//!
//! Every key is optional; command-line flags override whatever the file says.
//!
//! ```toml
//! model_path = "models/disease_predictor.toml"
//! store_path = "predictions.jsonl"
//! recent_limit = 10
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MODEL_PATH: &str = "models/disease_predictor.toml";
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    /// Predictions are only persisted when a store is configured.
    pub store_path: Option<PathBuf>,
    pub recent_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            store_path: None,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("recent_limit must be at least 1.")]
    ZeroRecentLimit,
}

impl ServiceConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        if config.recent_limit == 0 {
            return Err(ConfigError::ZeroRecentLimit);
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }

    /// Defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
