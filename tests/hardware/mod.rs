//! Hardware-specific tests requiring a real serial loopback.
//!
//! These tests are ignored by default and require actual hardware to run.
//! Wire TX to RX on the port named by `TEST_PORT` and run with the
//! `--ignored` flag.

pub mod loopback_tests;
pub mod utils;
