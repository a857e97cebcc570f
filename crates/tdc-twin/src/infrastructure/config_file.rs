//! TOML configuration files
//!
//! ```toml
//! n_delay = 8
//! n_ctr = 4
//! interleaved = false
//!
//! [delays]
//! ring_nor = 40
//! ```
//!
//! Missing keys fall back to [`TdcConfig::default`]; loaded files are
//! validated before they are returned.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{ConfigError, TdcConfig};

/// Errors reading or writing a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Filesystem failure
    #[error("config file {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML or wrong field types
    #[error("config file {path}: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Configuration could not be rendered
    #[error("cannot render config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Well-formed file describing an impossible circuit
    #[error("config file {path}: {source}")]
    Invalid {
        /// File involved
        path: PathBuf,
        /// Validation failure
        #[source]
        source: ConfigError,
    },
}

/// Read and validate a configuration
pub fn load_config(path: impl AsRef<Path>) -> Result<TdcConfig, ConfigFileError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = TdcConfig::from_toml_str(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate().map_err(|source| ConfigFileError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), stages = config.n_delay, "config loaded");
    Ok(config)
}

/// Write a configuration as pretty TOML, replacing any existing file
pub fn save_config(path: impl AsRef<Path>, config: &TdcConfig) -> Result<(), ConfigFileError> {
    let path = path.as_ref();
    let content = config.to_toml_string()?;
    fs::write(path, content).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "config saved");
    Ok(())
}
