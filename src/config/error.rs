//! Errors raised while locating, parsing or validating configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid configuration: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value that parsed but makes no sense, keyed by its dotted path.
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    /// An override variable that could not be applied.
    #[error("invalid {var}={value:?}: {message}")]
    Env {
        var: String,
        value: String,
        message: String,
    },

    #[error("{0} must be set")]
    Missing(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing(key.into())
    }

    /// Dotted key or variable name the error refers to, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Invalid { key, .. } | Self::Missing(key) => Some(key),
            Self::Env { var, .. } => Some(var),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
