//! Core trait for channel backends.
//!
//! Defines the `TransportBackend` capability set that lets live hardware,
//! simulated testbenches and mocks be driven by the same engine.

use super::error::BackendError;
use crate::matrix::ChannelConfig;
use std::time::Instant;

/// Byte-stream channel under test.
///
/// Implementations must never block in [`bytes_available`] or [`read`]; the
/// engine does its own waiting between polls.
///
/// [`bytes_available`]: TransportBackend::bytes_available
/// [`read`]: TransportBackend::read
pub trait TransportBackend: Send + std::fmt::Debug {
    /// Human-readable name of the channel (port path, simulator name).
    fn name(&self) -> &str;

    /// Open the channel with the given configuration.
    ///
    /// Fails with `BackendError::Connection` if the device or simulator is
    /// unreachable.
    fn open(&mut self, config: &ChannelConfig) -> Result<(), BackendError>;

    /// Apply a new configuration to an open channel.
    ///
    /// The default closes and reopens.
    fn reconfigure(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        self.close()?;
        self.open(config)
    }

    /// Whether `open` has succeeded and `close` has not been called since.
    fn is_open(&self) -> bool;

    /// Queue bytes for transmission.
    fn write(&mut self, data: &[u8]) -> Result<(), BackendError>;

    /// Push queued bytes through the channel.
    fn flush(&mut self) -> Result<(), BackendError>;

    /// Number of received bytes ready to read.
    fn bytes_available(&mut self) -> Result<usize, BackendError>;

    /// Return up to `max` buffered bytes; an empty vector when none are buffered.
    fn read(&mut self, max: usize) -> Result<Vec<u8>, BackendError>;

    /// Discard all buffered input, returning how many bytes were dropped.
    fn drain(&mut self) -> Result<usize, BackendError>;

    /// Close the channel. Closing a closed channel succeeds.
    fn close(&mut self) -> Result<(), BackendError>;

    /// Device-reported log for backends that have one.
    fn diagnostic_log(&self) -> Option<String> {
        None
    }

    /// Wall-clock limit for the running case. Backends whose calls can
    /// block for long, such as a simulator run inside `flush`, must give up
    /// once it passes. Cleared by `end_case`.
    fn set_deadline(&mut self, _deadline: Option<Instant>) {}

    /// Release per-case resources such as artifact files.
    fn end_case(&mut self) {}
}

impl<B: TransportBackend + ?Sized> TransportBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        (**self).open(config)
    }

    fn reconfigure(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        (**self).reconfigure(config)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), BackendError> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        (**self).flush()
    }

    fn bytes_available(&mut self) -> Result<usize, BackendError> {
        (**self).bytes_available()
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, BackendError> {
        (**self).read(max)
    }

    fn drain(&mut self) -> Result<usize, BackendError> {
        (**self).drain()
    }

    fn close(&mut self) -> Result<(), BackendError> {
        (**self).close()
    }

    fn diagnostic_log(&self) -> Option<String> {
        (**self).diagnostic_log()
    }

    fn set_deadline(&mut self, deadline: Option<Instant>) {
        (**self).set_deadline(deadline)
    }

    fn end_case(&mut self) {
        (**self).end_case()
    }
}
