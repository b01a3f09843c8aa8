//! Backend-specific error types.
//!
//! Kept separate from [`HarnessError`](crate::HarnessError) so transports can
//! report faults without knowing how the engine classifies them.

use super::artifact::ArtifactError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`TransportBackend`](super::TransportBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The device or simulator could not be reached.
    #[error("Cannot reach {target}: {reason}")]
    Connection { target: String, reason: String },

    /// The channel was used before `open` or after `close`.
    #[error("Channel is not open")]
    NotOpen,

    /// An I/O error occurred on the channel or an artifact file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The external run did not finish in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The simulator exited abnormally or produced no response.
    #[error("Simulator failure: {0}")]
    Simulator(String),

    /// A stimulus or response artifact was malformed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl BackendError {
    /// Create a Connection error for a missing device.
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            reason: "device not found".to_string(),
        }
    }

    /// Create a Connection error with a reason.
    pub fn connection(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a Simulator error from a message.
    pub fn simulator(message: impl Into<String>) -> Self {
        Self::Simulator(message.into())
    }
}
