//! Storage configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```
//! use piecemeal::config::StorageConfig;
//!
//! let config = StorageConfig::from_toml_str(r#"
//!     download_dir = "/srv/torrents"
//!     piece_length = 524288
//! "#).unwrap();
//!
//! assert_eq!(config.piece_length, 524288);
//! assert_eq!(config.block_size, 16384);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{BLOCK_SIZE, CLIENT_NAME, DEFAULT_ANNOUNCE, DEFAULT_PIECE_LENGTH};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config is not valid toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config value for `{0}`: must be greater than zero")]
    Zero(&'static str),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Root under which verified pieces are persisted.
    pub download_dir: PathBuf,
    /// Block granularity used to track received data within a piece.
    pub block_size: u32,
    /// Piece length used when creating torrents.
    pub piece_length: u64,
    /// Announce URL written into created torrents.
    pub announce: String,
    /// `created by` value written into created torrents.
    pub created_by: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            block_size: BLOCK_SIZE,
            piece_length: DEFAULT_PIECE_LENGTH,
            announce: DEFAULT_ANNOUNCE.to_string(),
            created_by: CLIENT_NAME.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded storage config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::Zero("block_size"));
        }
        if self.piece_length == 0 {
            return Err(ConfigError::Zero("piece_length"));
        }
        Ok(())
    }
}
