//! UART Conformance Library
//!
//! This library drives a byte-stream channel through a matrix of loopback
//! tests and classifies every case as pass, timeout, mismatch, device error
//! or transport failure.
//!
//! # Modules
//!
//! - `pattern`: Deterministic byte generators for test payloads
//! - `matrix`: Test case descriptors, axes and the matrix generator
//! - `backend`: Channel abstraction with live serial, simulated and mock backends
//! - `engine`: Burst transfer state machine producing per-case verdicts
//! - `report`: Verdict model and suite reporter
//! - `suite`: Suite runner that manages the channel lifecycle
//! - `config`: Configuration management with TOML support
//! - `error`: Crate-level error handling
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use uart_conformance::backend::MockBackend;
//! use uart_conformance::engine::TransferSettings;
//! use uart_conformance::matrix::MatrixAxes;
//! use uart_conformance::suite::{run_suite, ConnectionPolicy};
//!
//! let mut axes = MatrixAxes::empty();
//! axes.random_bauds = vec![9600, 115200];
//!
//! let mut backend = MockBackend::new("loopback");
//! let settings = TransferSettings::new(Duration::ZERO, 2);
//! let result = run_suite(&axes, Some(7), &mut backend, settings, ConnectionPolicy::Reuse)?;
//!
//! assert!(result.is_success());
//! assert_eq!(result.summary.total, 2);
//! # Ok::<(), uart_conformance::HarnessError>(())
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod pattern;
pub mod report;
pub mod suite;

// Re-export commonly used types for convenience
pub use backend::{
    BackendError, LiveBackend, MockBackend, SimulatedBackend, SimulatorSettings, TransportBackend,
};
pub use engine::{BurstTransferEngine, TransferSettings};
pub use error::{HarnessError, HarnessResult};
pub use matrix::{ChannelConfig, ClockPair, MatrixAxes, MatrixGenerator, TestCase};
pub use pattern::DataPattern;
pub use report::{Outcome, Reporter, SuiteResult, SuiteSummary, TransferResult};
pub use suite::{run_suite, ConnectionPolicy, SuiteRunner};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
