//! Verdict scenarios run end to end through the suite runner.
//!
//! These tests verify the classification of:
//! - A clean random-data loopback (pass)
//! - A short echo (timeout with a partial byte count)
//! - A corrupted echo (mismatch at the corrupted index)
//! - Directional clock pairs evaluated independently
//! - A device-reported error on an otherwise clean transfer

use crate::common::*;
use pretty_assertions::assert_eq;
use uart_conformance::backend::MockBackend;
use uart_conformance::matrix::{ChannelConfig, ClockPair, ClockPairAxis, MatrixAxes};
use uart_conformance::pattern::DataPattern;
use uart_conformance::report::Outcome;
use uart_conformance::suite::{run_suite, ConnectionPolicy, SuiteRunner};
use uart_conformance::HarnessError;

#[test]
fn test_random_loopback_passes() {
    let case = single_burst_case("scenario_a", 115200, DataPattern::random(11), 2000);
    let mut backend = MockBackend::new("MOCK0");

    let suite = SuiteRunner::new(fast_settings())
        .run(std::slice::from_ref(&case), &mut backend)
        .unwrap();

    let result = &suite.results[0];
    assert_eq!(result.outcome, Outcome::Pass);
    assert_eq!(result.bytes_expected, 2000);
    assert_eq!(result.bytes_received, 2000);
    assert_eq!(backend.write_log(), vec![case.pattern().payload(2000, 0)]);
}

#[test]
fn test_short_echo_times_out() {
    let case = single_burst_case("scenario_b", 921600, DataPattern::constant(0xFF), 250);
    let mut backend = MockBackend::new("MOCK0");
    backend.truncate_echo(100);

    let suite = SuiteRunner::new(fast_settings())
        .run(&[case], &mut backend)
        .unwrap();

    let result = &suite.results[0];
    assert_eq!(result.outcome, Outcome::Timeout);
    assert_eq!(result.bytes_received, 100);
    assert_eq!(backend.read_count(), 0);
    assert_eq!(suite.summary.timeouts, 1);
}

#[test]
fn test_corrupted_byte_mismatch() {
    let case = single_burst_case("scenario_c", 115200, DataPattern::random(11), 2000);
    let mut backend = MockBackend::new("MOCK0");
    backend.corrupt_byte(17);

    let suite = SuiteRunner::new(fast_settings())
        .run(&[case], &mut backend)
        .unwrap();

    let result = &suite.results[0];
    assert_eq!(result.outcome, Outcome::Mismatch);
    assert_eq!(result.first_mismatch_index, Some(17));
    assert_eq!(result.failed_burst, Some(0));
    assert!(!suite.is_success());
}

#[test]
fn test_directional_clock_pairs() {
    let mut axes = MatrixAxes::empty();
    axes.clock_pairs = ClockPairAxis {
        candidates: vec![100e6, 125e6],
        bauds: vec![115200],
        burst_size: Some(2500),
    };
    let mut backend = MockBackend::new("MOCK0");
    let handle = backend.clone();

    let suite = run_suite(
        &axes,
        Some(9),
        &mut backend,
        fast_settings(),
        ConnectionPolicy::Reuse,
    )
    .unwrap();

    let ids: Vec<&str> = suite.results.iter().map(|r| r.test_case_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "random_data_115200_baud_100mhz_125mhz_clocks_2500_bytes",
            "random_data_115200_baud_125mhz_100mhz_clocks_2500_bytes",
        ]
    );
    assert!(suite.results.iter().all(|r| r.outcome == Outcome::Pass));
    // Swapping clocks is a configuration change.
    assert_eq!(handle.reconfigure_count(), 1);
}

#[test]
fn test_device_log_error_overrides_pass() {
    let case = single_burst_case("scenario_e", 115200, DataPattern::ByteIndex, 64);
    let mut backend = MockBackend::new("MOCK0");
    backend.set_device_log("rx fifo ok\nUART error: stop bit missing\n");

    let suite = SuiteRunner::new(fast_settings())
        .run(&[case], &mut backend)
        .unwrap();

    let result = &suite.results[0];
    assert_eq!(result.outcome, Outcome::DeviceError);
    assert_eq!(result.first_mismatch_index, None);
    assert_eq!(suite.summary.device_errors, 1);
}

#[test]
fn test_suite_continues_after_failure_and_reports_json() {
    let cases = vec![
        single_burst_case("first", 9600, DataPattern::ByteIndex, 8),
        burst_case("second", 9600, DataPattern::BurstIndex, 4, 3),
    ];
    let mut backend = MockBackend::new("MOCK0");
    backend.set_echo(false);

    let suite = SuiteRunner::new(fast_settings())
        .with_policy(ConnectionPolicy::ReopenPerCase)
        .run(&cases, &mut backend)
        .unwrap();

    assert_eq!(suite.summary.total, 2);
    assert_eq!(suite.summary.timeouts, 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    suite.write_json(&path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["summary"]["timeouts"], 2);
    assert_eq!(json["results"][1]["test_case_id"], "second");
    assert_eq!(json["results"][1]["outcome"], "timeout");
}

#[test]
fn test_open_failure_aborts_suite() {
    let mut backend = MockBackend::new("MISSING");
    let handle = backend.clone();
    backend.fail_open(true);

    let err = SuiteRunner::new(fast_settings())
        .run(
            &[single_burst_case("never", 9600, DataPattern::ByteIndex, 1)],
            &mut backend,
        )
        .unwrap_err();

    assert!(matches!(err, HarnessError::Connection { .. }));
    assert_eq!(handle.open_count(), 0);
    assert_eq!(handle.cases_ended(), 0);
}

#[test]
fn test_reused_channel_is_not_reopened() {
    let config = ChannelConfig::new(9600, ClockPair::default());
    let (mut backend, handle) = open_mock(&config);
    let cases = vec![
        single_burst_case("one", 9600, DataPattern::ByteIndex, 8),
        single_burst_case("two", 9600, DataPattern::ByteIndex, 8),
    ];

    let suite = SuiteRunner::new(fast_settings())
        .run(&cases, &mut backend)
        .unwrap();

    assert!(suite.is_success());
    // The first case still applies its configuration to the open channel.
    assert_eq!(handle.open_count(), 1);
    assert_eq!(handle.reconfigure_count(), 1);
    assert_eq!(handle.drain_count(), 2);
    assert_eq!(handle.close_count(), 1);
}
