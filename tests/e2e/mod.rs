//! End-to-end tests for the conformance harness.
//!
//! These tests run complete suites without requiring real hardware. They use
//! the in-memory loopback and, on Unix, a shell script standing in for a
//! simulator.

pub mod matrix_tests;
pub mod scenario_tests;

#[cfg(unix)]
pub mod simulated_tests;
