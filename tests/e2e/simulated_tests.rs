//! Simulated backend E2E tests using `sh` as a stand-in simulator.
//!
//! The scripts copy the stimulus artifact to the response artifact, which is
//! what a loopback testbench does, and print to the console log the engine
//! scans for device errors.

use crate::common::*;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::time::{Duration, Instant};
use uart_conformance::backend::{SimulatedBackend, SimulatorSettings};
use uart_conformance::config::SimulationConfig;
use uart_conformance::matrix::{MatrixAxes, StaticAxis};
use uart_conformance::pattern::DataPattern;
use uart_conformance::report::Outcome;
use uart_conformance::suite::{run_suite, ConnectionPolicy, SuiteRunner};

fn shell(dir: &Path, script: &str) -> SimulatorSettings {
    SimulatorSettings::new("sh", dir).with_args(vec!["-c".to_string(), script.to_string()])
}

const LOOPBACK: &str = "cp \"$UART_STIMULUS\" \"$UART_RESPONSE\"; echo \"sim done at {baud}\"";

#[test]
fn test_simulated_loopback_passes() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = SimulatedBackend::new(shell(dir.path(), LOOPBACK));

    let case = burst_case("sim_pass", 115200, DataPattern::ByteIndex, 32, 2);
    let suite = SuiteRunner::new(fast_settings())
        .run(&[case], &mut backend)
        .unwrap();

    assert_eq!(suite.results[0].outcome, Outcome::Pass);
    assert_eq!(suite.results[0].bytes_received, 64);
    assert_eq!(backend.run_count(), 2);
    // Artifacts are removed once the case ends.
    assert!(!dir.path().join("stimulus.txt").exists());
}

#[test]
fn test_simulated_device_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = "cp \"$UART_STIMULUS\" \"$UART_RESPONSE\"; echo \"Error: RX overrun\"";
    let mut backend = SimulatedBackend::new(shell(dir.path(), script));

    let case = single_burst_case("sim_error", 115200, DataPattern::ByteIndex, 16);
    let suite = SuiteRunner::new(fast_settings())
        .run(&[case], &mut backend)
        .unwrap();

    let result = &suite.results[0];
    assert_eq!(result.outcome, Outcome::DeviceError);
    assert_eq!(result.detail.as_deref(), Some("Error: RX overrun"));
}

#[test]
fn test_simulator_dropping_a_byte() {
    let dir = tempfile::tempdir().unwrap();
    let script = "head -n 15 \"$UART_STIMULUS\" > \"$UART_RESPONSE\"";
    let mut backend = SimulatedBackend::new(shell(dir.path(), script));

    let case = single_burst_case("sim_short", 9600, DataPattern::ByteIndex, 16);
    let suite = SuiteRunner::new(fast_settings())
        .run(&[case], &mut backend)
        .unwrap();

    assert_eq!(suite.results[0].outcome, Outcome::Timeout);
    assert_eq!(suite.results[0].bytes_received, 15);
}

#[test]
fn test_missing_response_is_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = SimulatedBackend::new(shell(dir.path(), "exit 3"));

    let case = single_burst_case("sim_broken", 9600, DataPattern::ByteIndex, 4);
    let suite = SuiteRunner::new(fast_settings())
        .run(&[case], &mut backend)
        .unwrap();

    assert_eq!(suite.results[0].outcome, Outcome::TransportFailure);
}

#[test]
fn test_keep_artifacts_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimulationConfig {
        command: Some("sh".to_string()),
        args: vec!["-c".to_string(), LOOPBACK.to_string()],
        working_dir: dir.path().to_path_buf(),
        keep_artifacts: true,
        ..SimulationConfig::default()
    };
    let mut backend = SimulatedBackend::new(config.settings().unwrap());

    let mut axes = MatrixAxes::empty();
    axes.static_data = StaticAxis {
        bauds: vec![9600],
        extra_values: Vec::new(),
    };
    let suite = run_suite(
        &axes,
        Some(3),
        &mut backend,
        fast_settings(),
        ConnectionPolicy::Reuse,
    )
    .unwrap();

    assert!(suite.is_success());
    assert_eq!(suite.summary.total, 4);
    let stimulus = std::fs::read_to_string(dir.path().join("stimulus.txt")).unwrap();
    // Last case sends a single 0xFF byte.
    assert_eq!(stimulus, "11111111\n");
}

#[test]
fn test_hung_simulator_respects_case_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let script = "sleep 3; cp \"$UART_STIMULUS\" \"$UART_RESPONSE\"";
    let settings = shell(dir.path(), script).with_run_timeout(Duration::from_secs(30));
    let mut backend = SimulatedBackend::new(settings);

    let case = single_burst_case("sim_hung", 115200, DataPattern::ByteIndex, 8);
    let started = Instant::now();
    let suite = SuiteRunner::new(fast_settings().with_case_timeout(Duration::from_millis(200)))
        .run(&[case], &mut backend)
        .unwrap();

    let result = &suite.results[0];
    assert_eq!(result.outcome, Outcome::Timeout);
    assert_eq!(result.detail.as_deref(), Some("case deadline exceeded"));
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
}
