//! Matrix generation E2E tests: configuration file -> axes -> cases.
//!
//! These tests verify:
//! - The default matrix shape and ordering
//! - Reproducibility with a fixed seed
//! - Axes loaded from TOML
//! - Case selection

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use uart_conformance::config::ConfigLoader;
use uart_conformance::matrix::{MatrixAxes, MatrixGenerator, TestCase};
use uart_conformance::pattern::DataPattern;

fn default_cases(seed: u64) -> Vec<TestCase> {
    MatrixGenerator::new(MatrixAxes::default())
        .with_seed(seed)
        .generate()
        .unwrap()
}

#[test]
fn test_default_matrix_shape() {
    let cases = default_cases(1);
    assert_eq!(cases.len(), 41);

    let ids: HashSet<&str> = cases.iter().map(|c| c.id()).collect();
    assert_eq!(ids.len(), cases.len());

    // Random data first, explicit power-of-two case last.
    assert_eq!(
        cases[0].id(),
        "random_data_115200_baud_100mhz_100mhz_clocks_2000_bytes"
    );
    assert_eq!(
        cases.last().unwrap().id(),
        "power_of_2_divisor_baud_115200_random_data"
    );
}

#[test]
fn test_slow_bauds_use_small_payloads() {
    for case in default_cases(2) {
        if case.config().baud < 115200 && case.pattern().is_random() {
            assert_eq!(case.burst_size(), 20, "{}", case.id());
        }
    }
}

#[test]
fn test_seed_reproduces_payloads() {
    let first = default_cases(42);
    let second = default_cases(42);
    assert_eq!(first, second);

    let other = default_cases(43);
    assert_ne!(first[0].pattern().payload(64, 0), other[0].pattern().payload(64, 0));
}

#[test]
fn test_static_cases_cover_boundary_values() {
    let values: Vec<u8> = default_cases(3)
        .iter()
        .filter(|c| c.config().baud == 921600)
        .filter_map(|c| match c.pattern() {
            DataPattern::Constant { value } => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![0x00, 0x55, 0xAA, 0xFF]);
}

#[test]
fn test_axes_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uart-conformance.toml");
    std::fs::write(
        &path,
        r#"
[matrix]
random_bauds = [9600, 230400]
bursts = []
explicit = []

[matrix.static_data]
bauds = []

[matrix.clock_pairs]
candidates = [100000000.0, 125000000.0]
bauds = [115200]
burst_size = 2500
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from(&path).unwrap().into_config();
    let cases = MatrixGenerator::new(config.matrix)
        .with_seed(5)
        .generate()
        .unwrap();

    let ids: Vec<&str> = cases.iter().map(|c| c.id()).collect();
    assert_eq!(
        ids,
        vec![
            "random_data_9600_baud_100mhz_100mhz_clocks_20_bytes",
            "random_data_230400_baud_100mhz_100mhz_clocks_2000_bytes",
            "random_data_115200_baud_100mhz_125mhz_clocks_2500_bytes",
            "random_data_115200_baud_125mhz_100mhz_clocks_2500_bytes",
        ]
    );
}

#[test]
fn test_selection_narrows_matrix() {
    let mut config = ConfigLoader::defaults().unwrap().into_config();
    config.selection.bauds = vec![9600];
    config.selection.id_pattern = Some("^static_data".to_string());

    let cases = config.selection.filter().unwrap().apply(default_cases(4));
    assert_eq!(cases.len(), 4);
    assert!(cases.iter().all(|c| c.config().baud == 9600));
}
