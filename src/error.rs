//! Crate-level error type.
//!
//! Only conditions that abort work before or between cases live here. Faults
//! inside a single case are captured as that case's [`Outcome`] and never
//! propagate past the case boundary.
//!
//! [`Outcome`]: crate::report::Outcome

use crate::backend::BackendError;
use crate::config::ConfigError;
use thiserror::Error;

/// Errors that stop matrix generation or a whole suite run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Axis values are invalid or two parameter sets map to the same case id.
    ///
    /// Raised at generation time, before any case executes.
    #[error("Invalid test matrix: {0}")]
    Configuration(String),

    /// The backend could not be reached when opening a channel.
    #[error("Could not connect to backend '{backend}': {source}")]
    Connection {
        backend: String,
        #[source]
        source: BackendError,
    },

    /// A result was recorded after the suite was finalized.
    #[error("Suite report already finalized")]
    ReporterFinalized,

    /// Loading or saving the configuration file failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing a report failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a report failed.
    #[error("Report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Create a configuration error from a message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Wrap a backend error raised while opening a channel.
    pub fn connection(backend: impl Into<String>, source: BackendError) -> Self {
        Self::Connection {
            backend: backend.into(),
            source,
        }
    }

    /// Whether this error must abort the whole suite.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ReporterFinalized)
    }
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
