//! Timing and classification knobs for the transfer engine.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Default pattern marking a fault line in a device log.
pub const DEFAULT_ERROR_MARKER: &str = r"(?i)\berror\b";

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

pub const DEFAULT_RETRIES: u32 = 2;

static DEFAULT_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_ERROR_MARKER).expect("built-in error marker compiles"));

/// How long to wait for echoed bytes and how to read the device log.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Pause before each poll of the receive buffer.
    pub settle_delay: Duration,
    /// Extra polls allowed after the first one comes up short.
    pub retries: u32,
    /// Wall-clock budget for a whole case.
    pub case_timeout: Option<Duration>,
    /// Line pattern that marks a device-reported fault.
    pub error_marker: Regex,
}

impl TransferSettings {
    pub fn new(settle_delay: Duration, retries: u32) -> Self {
        Self {
            settle_delay,
            retries,
            ..Self::default()
        }
    }

    pub fn with_case_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = Some(timeout);
        self
    }

    pub fn with_error_marker(mut self, marker: Regex) -> Self {
        self.error_marker = marker;
        self
    }

    /// Longest a single burst can wait for its echo.
    pub fn max_burst_wait(&self) -> Duration {
        self.settle_delay * (self.retries + 1)
    }

    /// First line of `log` matching the error marker.
    pub fn find_device_error<'a>(&self, log: &'a str) -> Option<&'a str> {
        log.lines().find(|line| self.error_marker.is_match(line))
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            retries: DEFAULT_RETRIES,
            case_timeout: None,
            error_marker: DEFAULT_MARKER_REGEX.clone(),
        }
    }
}
