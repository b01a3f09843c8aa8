//! Test case descriptors and their channel configuration.

use crate::error::{HarnessError, HarnessResult};
use crate::pattern::DataPattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Receiver oversampling factor assumed by the soft baud sanity check.
const OVERSAMPLING: f64 = 16.0;

/// Local and remote receiver clock frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockPair {
    pub local_hz: f64,
    pub remote_hz: f64,
}

impl ClockPair {
    pub fn new(local_hz: f64, remote_hz: f64) -> Self {
        Self {
            local_hz,
            remote_hz,
        }
    }

    /// Both ends running from the same frequency.
    pub fn symmetric(hz: f64) -> Self {
        Self::new(hz, hz)
    }

    /// The same pair seen from the other end.
    pub fn swapped(self) -> Self {
        Self::new(self.remote_hz, self.local_hz)
    }
}

impl Default for ClockPair {
    fn default() -> Self {
        Self::symmetric(100e6)
    }
}

/// Serial channel parameters a case runs with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub baud: u32,
    pub local_clock_hz: f64,
    pub remote_clock_hz: f64,
}

impl ChannelConfig {
    pub fn new(baud: u32, clocks: ClockPair) -> Self {
        Self {
            baud,
            local_clock_hz: clocks.local_hz,
            remote_clock_hz: clocks.remote_hz,
        }
    }

    pub fn clocks(&self) -> ClockPair {
        ClockPair::new(self.local_clock_hz, self.remote_clock_hz)
    }

    /// Reject non-positive baud rates and clocks.
    ///
    /// A baud rate above `min(clock) / 16` is suspicious but legal; it only
    /// produces a warning.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.baud == 0 {
            return Err(HarnessError::configuration("baud rate must be positive"));
        }
        for (end, hz) in [
            ("local", self.local_clock_hz),
            ("remote", self.remote_clock_hz),
        ] {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(HarnessError::configuration(format!(
                    "{end} clock must be a positive frequency, got {hz}"
                )));
            }
        }
        let slowest = self.local_clock_hz.min(self.remote_clock_hz);
        if f64::from(self.baud) > slowest / OVERSAMPLING {
            warn!(
                baud = self.baud,
                clock_hz = slowest,
                "baud rate exceeds clock / {OVERSAMPLING}"
            );
        }
        Ok(())
    }

    /// Id fragment for the clock pair, e.g. `100mhz_125mhz`.
    pub fn clock_tag(&self) -> String {
        format!(
            "{}_{}",
            format_frequency(self.local_clock_hz),
            format_frequency(self.remote_clock_hz)
        )
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} baud, {} local / {} remote clock",
            self.baud,
            format_frequency(self.local_clock_hz),
            format_frequency(self.remote_clock_hz)
        )
    }
}

/// Render a frequency without losing precision: `100mhz`, `1843200hz`.
pub fn format_frequency(hz: f64) -> String {
    let whole = hz.round();
    if (hz - whole).abs() > 1e-6 {
        return format!("{hz}hz");
    }
    let whole = whole as u64;
    if whole % 1_000_000 == 0 {
        format!("{}mhz", whole / 1_000_000)
    } else if whole % 1_000 == 0 {
        format!("{}khz", whole / 1_000)
    } else {
        format!("{whole}hz")
    }
}

/// Build the canonical id for a generated case.
pub fn case_id(label: &str, config: &ChannelConfig, burst_size: usize, burst_count: usize) -> String {
    let mut id = format!(
        "{label}_{}_baud_{}_clocks_{burst_size}_bytes",
        config.baud,
        config.clock_tag()
    );
    if burst_count > 1 {
        id.push_str(&format!("_x{burst_count}"));
    }
    id
}

/// One immutable entry of the test matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    id: String,
    description: String,
    config: ChannelConfig,
    pattern: DataPattern,
    burst_size: usize,
    burst_count: usize,
}

impl TestCase {
    /// Create a case, validating the channel and burst shape.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        config: ChannelConfig,
        pattern: DataPattern,
        burst_size: usize,
        burst_count: usize,
    ) -> HarnessResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(HarnessError::configuration("case id must not be empty"));
        }
        if burst_size == 0 || burst_count == 0 {
            return Err(HarnessError::configuration(format!(
                "case '{id}' needs a positive burst size and count"
            )));
        }
        config.validate()?;

        Ok(Self {
            id,
            description: description.into(),
            config,
            pattern,
            burst_size,
            burst_count,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn pattern(&self) -> &DataPattern {
        &self.pattern
    }

    pub fn burst_size(&self) -> usize {
        self.burst_size
    }

    pub fn burst_count(&self) -> usize {
        self.burst_count
    }

    /// Total number of bytes the case transmits.
    pub fn total_bytes(&self) -> usize {
        self.burst_size * self.burst_count
    }

    /// Parameters that identify a case independently of its random seed.
    pub(crate) fn parameter_key(&self) -> (ChannelConfig, String, usize, usize) {
        (
            self.config,
            self.pattern.label(),
            self.burst_size,
            self.burst_count,
        )
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.description)
    }
}
