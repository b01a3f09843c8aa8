//! Data patterns for burst payloads.
//!
//! A pattern is a pure function of `(byte_index, burst_index)`. Random data is
//! derived from a PCG stream keyed by the seed and the burst index, so sampling
//! one index and materializing a whole burst always agree.

use rand::Rng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boundary byte values every static-data sweep covers.
pub const BOUNDARY_VALUES: [u8; 4] = [0x00, 0x55, 0xAA, 0xFF];

/// Base PCG state, mixed with the per-case seed; the burst index picks the stream.
const PCG_STATE: u128 = 0xcafe_f00d_d15e_a5e5_0123_4567_89ab_cdef;

/// Byte generator for one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataPattern {
    /// Every byte has the same value.
    Constant { value: u8 },
    /// `first` at even byte indices, `second` at odd ones.
    Alternating { first: u8, second: u8 },
    /// Every byte of burst `b` is `b mod 256`.
    BurstIndex,
    /// Byte `i` is `i mod 256`.
    ByteIndex,
    /// Uniformly random bytes.
    Random {
        #[serde(default)]
        seed: u64,
    },
}

impl DataPattern {
    pub fn constant(value: u8) -> Self {
        Self::Constant { value }
    }

    pub fn alternating(first: u8, second: u8) -> Self {
        Self::Alternating { first, second }
    }

    pub fn random(seed: u64) -> Self {
        Self::Random { seed }
    }

    /// Byte value at `byte_index` within burst `burst_index`.
    pub fn sample(&self, byte_index: usize, burst_index: usize) -> u8 {
        match *self {
            Self::Constant { value } => value,
            Self::Alternating { first, second } => {
                if byte_index % 2 == 0 {
                    first
                } else {
                    second
                }
            }
            Self::BurstIndex => (burst_index % 256) as u8,
            Self::ByteIndex => (byte_index % 256) as u8,
            Self::Random { seed } => {
                let mut rng = random_stream(seed, burst_index);
                rng.advance(byte_index as u128);
                rng.gen()
            }
        }
    }

    /// Materialize the payload of one burst.
    pub fn payload(&self, burst_size: usize, burst_index: usize) -> Vec<u8> {
        match *self {
            Self::Random { seed } => {
                let mut rng = random_stream(seed, burst_index);
                (0..burst_size).map(|_| rng.gen()).collect()
            }
            _ => (0..burst_size)
                .map(|i| self.sample(i, burst_index))
                .collect(),
        }
    }

    /// Short label used when building case ids.
    pub fn label(&self) -> String {
        match *self {
            Self::Constant { value } => format!("static_data_{value:#04x}"),
            Self::Alternating { first, second } => {
                format!("alternating_{first:#04x}_{second:#04x}")
            }
            Self::BurstIndex => "burst_index".to_string(),
            Self::ByteIndex => "byte_index".to_string(),
            Self::Random { .. } => "random_data".to_string(),
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Self::Random { .. })
    }

    /// Replace the seed of a random pattern; other patterns are unchanged.
    pub fn reseeded(self, seed: u64) -> Self {
        match self {
            Self::Random { .. } => Self::Random { seed },
            other => other,
        }
    }
}

impl fmt::Display for DataPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Constant { value } => write!(f, "static bytes ({value:#04x})"),
            Self::Alternating { first, second } => {
                write!(f, "alternating bytes ({first:#04x} {second:#04x})")
            }
            Self::BurstIndex => write!(f, "bytes equal to the burst index"),
            Self::ByteIndex => write!(f, "counting bytes"),
            Self::Random { .. } => write!(f, "random bytes"),
        }
    }
}

fn random_stream(seed: u64, burst_index: usize) -> Pcg64 {
    // The stream id loses its top bit, so the seed goes into the state.
    Pcg64::new(PCG_STATE ^ u128::from(seed), burst_index as u128)
}
