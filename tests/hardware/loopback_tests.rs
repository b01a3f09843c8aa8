//! Live loopback tests against a physical port.
//!
//! Requires TX wired to RX. Run with:
//! `TEST_PORT=/dev/ttyUSB0 cargo test --test integration_hardware -- --ignored`

use crate::common::*;
use crate::require_rig;
use serial_test::serial;
use std::time::Duration;
use uart_conformance::backend::TransportBackend;
use uart_conformance::engine::{BurstTransferEngine, TransferSettings};
use uart_conformance::matrix::{ChannelConfig, ClockPair, MatrixAxes};
use uart_conformance::pattern::DataPattern;
use uart_conformance::report::Outcome;
use uart_conformance::suite::{run_suite, ConnectionPolicy};

fn live_settings() -> TransferSettings {
    TransferSettings::new(Duration::from_millis(200), 2)
}

#[test]
#[ignore]
#[serial]
fn test_single_random_burst() {
    let rig = require_rig!();
    let mut backend = rig.backend();
    backend
        .open(&ChannelConfig::new(rig.baud, ClockPair::default()))
        .unwrap();

    let case = single_burst_case("hw_random", rig.baud, DataPattern::random(1), 64);
    let result = BurstTransferEngine::new(live_settings()).run_case(&mut backend, &case);
    backend.close().unwrap();

    assert_eq!(result.outcome, Outcome::Pass, "{result}");
}

#[test]
#[ignore]
#[serial]
fn test_static_axis_at_test_baud() {
    let rig = require_rig!();
    let mut backend = rig.backend();

    let mut axes = MatrixAxes::empty();
    axes.static_data.bauds = vec![rig.baud];
    let suite = run_suite(
        &axes,
        Some(1),
        &mut backend,
        live_settings(),
        ConnectionPolicy::Reuse,
    )
    .unwrap();

    assert!(suite.is_success(), "{suite}");
    assert!(!backend.is_open());
}

#[test]
#[ignore]
#[serial]
fn test_reopen_per_case() {
    let rig = require_rig!();
    let mut backend = rig.backend();

    let mut axes = MatrixAxes::empty();
    axes.random_bauds = vec![rig.baud, 9600];
    let suite = run_suite(
        &axes,
        None,
        &mut backend,
        live_settings(),
        ConnectionPolicy::ReopenPerCase,
    )
    .unwrap();

    assert_eq!(suite.summary.total, 2);
    assert!(suite.is_success(), "{suite}");
}
