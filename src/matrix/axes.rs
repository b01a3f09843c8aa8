//! Declarative axes of the test matrix.
//!
//! Every struct here deserializes from the `[matrix]` table of the
//! configuration file. The defaults describe the standard loopback suite.

use super::case::ClockPair;
use crate::pattern::DataPattern;
use serde::{Deserialize, Serialize};

/// Standard baud rates at or above 115200.
pub const FAST_BAUDS: &[u32] = &[115200, 230400, 460800, 921600];

/// Standard baud rates below 115200.
pub const SLOW_BAUDS: &[u32] = &[4800, 9600, 19200, 38400];

/// Clock frequencies crossed against each other by default.
pub const CLOCK_CANDIDATES: &[f64] = &[100e6, 32e6, 125e6];

/// Clock frequency whose divisor at 115200 baud is an exact power of two.
pub const POWER_OF_TWO_CLOCK_HZ: f64 = 117.9648e6;

/// Whether a baud rate belongs to the fast or the slow group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedClass {
    Fast,
    Slow,
}

/// Sample counts per speed class.
///
/// Slow baud rates get small payloads so a full run stays bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizePolicy {
    /// Lowest baud rate counted as fast.
    pub fast_threshold: u32,
    pub random_fast: usize,
    pub random_slow: usize,
    pub static_fast: usize,
    pub static_slow: usize,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            fast_threshold: 115200,
            random_fast: 2000,
            random_slow: 20,
            static_fast: 250,
            static_slow: 1,
        }
    }
}

impl SizePolicy {
    pub fn class_of(&self, baud: u32) -> SpeedClass {
        if baud >= self.fast_threshold {
            SpeedClass::Fast
        } else {
            SpeedClass::Slow
        }
    }

    pub fn random_size(&self, baud: u32) -> usize {
        match self.class_of(baud) {
            SpeedClass::Fast => self.random_fast,
            SpeedClass::Slow => self.random_slow,
        }
    }

    pub fn static_size(&self, baud: u32) -> usize {
        match self.class_of(baud) {
            SpeedClass::Fast => self.static_fast,
            SpeedClass::Slow => self.static_slow,
        }
    }
}

/// Constant-byte cases: one per (baud, value).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticAxis {
    pub bauds: Vec<u32>,
    /// Values tested after the boundary values 0x00, 0x55, 0xAA, 0xFF.
    pub extra_values: Vec<u8>,
}

impl Default for StaticAxis {
    fn default() -> Self {
        let mut bauds = vec![921600];
        bauds.extend_from_slice(SLOW_BAUDS);
        Self {
            bauds,
            extra_values: Vec::new(),
        }
    }
}

/// Random-data cases with mismatched local and remote clocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockPairAxis {
    pub candidates: Vec<f64>,
    pub bauds: Vec<u32>,
    /// Overrides the size policy when set.
    pub burst_size: Option<usize>,
}

impl Default for ClockPairAxis {
    fn default() -> Self {
        Self {
            candidates: CLOCK_CANDIDATES.to_vec(),
            bauds: vec![115200],
            burst_size: None,
        }
    }
}

/// A multi-burst pattern run at each listed baud rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstAxis {
    pub label: String,
    pub description: String,
    pub pattern: DataPattern,
    pub burst_size: usize,
    pub burst_count: usize,
    #[serde(default = "default_burst_bauds")]
    pub bauds: Vec<u32>,
}

fn default_burst_bauds() -> Vec<u32> {
    vec![115200]
}

impl BurstAxis {
    pub fn new(
        label: impl Into<String>,
        description: impl Into<String>,
        pattern: DataPattern,
        burst_size: usize,
        burst_count: usize,
    ) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            pattern,
            burst_size,
            burst_count,
            bauds: default_burst_bauds(),
        }
    }

    pub fn at_bauds(mut self, bauds: Vec<u32>) -> Self {
        self.bauds = bauds;
        self
    }
}

/// A case outside the combinatorial axes, appended after them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplicitCase {
    pub id: String,
    pub description: String,
    pub baud: u32,
    pub clocks: ClockPair,
    pub pattern: DataPattern,
    pub burst_size: usize,
    #[serde(default = "default_burst_count")]
    pub burst_count: usize,
}

fn default_burst_count() -> usize {
    1
}

impl ExplicitCase {
    /// Both dividers are a power of two at 115200 baud.
    pub fn power_of_two_divisor() -> Self {
        Self {
            id: "power_of_2_divisor_baud_115200_random_data".to_string(),
            description: "Check UART when the RX and TX dividers are a power of 2".to_string(),
            baud: 115200,
            clocks: ClockPair::symmetric(POWER_OF_TWO_CLOCK_HZ),
            pattern: DataPattern::random(0),
            burst_size: 2000,
            burst_count: 1,
        }
    }
}

/// All axes the generator expands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixAxes {
    pub default_clocks: ClockPair,
    pub sizes: SizePolicy,
    pub random_bauds: Vec<u32>,
    pub static_data: StaticAxis,
    pub clock_pairs: ClockPairAxis,
    pub bursts: Vec<BurstAxis>,
    pub explicit: Vec<ExplicitCase>,
}

impl Default for MatrixAxes {
    fn default() -> Self {
        let mut random_bauds = FAST_BAUDS.to_vec();
        random_bauds.extend_from_slice(SLOW_BAUDS);

        Self {
            default_clocks: ClockPair::default(),
            sizes: SizePolicy::default(),
            random_bauds,
            static_data: StaticAxis::default(),
            clock_pairs: ClockPairAxis::default(),
            bursts: default_bursts(),
            explicit: vec![ExplicitCase::power_of_two_divisor()],
        }
    }
}

impl MatrixAxes {
    /// Axes with every list empty; callers fill in what they need.
    pub fn empty() -> Self {
        Self {
            default_clocks: ClockPair::default(),
            sizes: SizePolicy::default(),
            random_bauds: Vec::new(),
            static_data: StaticAxis {
                bauds: Vec::new(),
                extra_values: Vec::new(),
            },
            clock_pairs: ClockPairAxis {
                candidates: Vec::new(),
                bauds: Vec::new(),
                burst_size: None,
            },
            bursts: Vec::new(),
            explicit: Vec::new(),
        }
    }
}

/// Multi-burst patterns of the hardware suite.
fn default_bursts() -> Vec<BurstAxis> {
    vec![
        BurstAxis::new(
            "single_byte_sweep",
            "Send bytes 0-255 individually and check each one is returned",
            DataPattern::BurstIndex,
            1,
            256,
        ),
        BurstAxis::new(
            "static_sequences",
            "Transmit 256 blocks of 1024 bytes using the block index as the byte value",
            DataPattern::BurstIndex,
            1 << 10,
            256,
        ),
        BurstAxis::new(
            "bit_flips_0xaa_0x55",
            "Transmit 20 blocks of alternating 0xAA 0x55 bytes",
            DataPattern::alternating(0xAA, 0x55),
            1 << 16,
            20,
        ),
        BurstAxis::new(
            "bit_flips_0xff_0x00",
            "Transmit 20 blocks of alternating 0xFF 0x00 bytes",
            DataPattern::alternating(0xFF, 0x00),
            1 << 16,
            20,
        ),
        BurstAxis::new(
            "endianness_0x81_0x18",
            "Transmit 20 blocks of alternating 0x81 0x18 bytes",
            DataPattern::alternating(0x81, 0x18),
            1 << 16,
            20,
        ),
        BurstAxis::new(
            "random_byte_sequences",
            "Transmit 20 blocks of random bytes",
            DataPattern::random(0),
            1 << 16,
            20,
        ),
    ]
}
