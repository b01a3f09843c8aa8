//! Shared test utilities for the conformance harness tests.
//!
//! This module provides common test infrastructure including:
//! - Engine settings that never sleep
//! - Case builders for hand-written scenarios
//! - Open loopback mocks with an inspection handle

#![allow(dead_code)]

use std::time::Duration;
use uart_conformance::backend::{MockBackend, TransportBackend};
use uart_conformance::engine::TransferSettings;
use uart_conformance::matrix::{ChannelConfig, ClockPair, TestCase};
use uart_conformance::pattern::DataPattern;

/// Engine settings with no settle delay and the default retry budget.
pub fn fast_settings() -> TransferSettings {
    TransferSettings::new(Duration::ZERO, 2)
}

/// Build a single-burst case at the default 100 MHz clocks.
pub fn single_burst_case(id: &str, baud: u32, pattern: DataPattern, size: usize) -> TestCase {
    burst_case(id, baud, pattern, size, 1)
}

/// Build a case at the default 100 MHz clocks.
pub fn burst_case(
    id: &str,
    baud: u32,
    pattern: DataPattern,
    size: usize,
    count: usize,
) -> TestCase {
    TestCase::new(
        id,
        format!("{id} test case"),
        ChannelConfig::new(baud, ClockPair::default()),
        pattern,
        size,
        count,
    )
    .expect("valid test case")
}

/// A loopback mock already opened for `config`, plus a handle sharing its state.
pub fn open_mock(config: &ChannelConfig) -> (MockBackend, MockBackend) {
    let mut backend = MockBackend::new("MOCK0");
    backend.open(config).expect("mock opens");
    let handle = backend.clone();
    (backend, handle)
}
