//! Sections of `uart-conformance.toml`. Every field has a default, so an
//! empty file runs the full conformance matrix with standard timing.

use super::error::{ConfigError, ConfigResult};
use crate::backend::SimulatorSettings;
use crate::engine::{TransferSettings, DEFAULT_ERROR_MARKER};
use crate::matrix::{CaseFilter, MatrixAxes};
use crate::suite::ConnectionPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Polling and classification
    pub transfer: TransferConfig,
    /// Case selection applied after generation
    pub selection: SelectionConfig,
    /// Live serial port
    pub live: LiveConfig,
    /// External simulator
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
    /// JSON report output
    pub report: ReportConfig,
    /// Test matrix axes
    pub matrix: MatrixAxes,
}

impl Config {
    /// Check the values serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        self.transfer.settings()?;
        self.selection.filter()?;
        if self.simulation.run_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "simulation.run_timeout_ms",
                "must be positive",
            ));
        }
        if self.live.io_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "live.io_timeout_ms",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Transfer engine section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Pause before each receive poll, in milliseconds
    pub settle_ms: u64,
    /// Extra polls after the first short one
    pub retries: u32,
    /// Wall-clock limit per case in milliseconds
    pub case_timeout_ms: Option<u64>,
    /// Regex marking a fault line in the device log
    pub error_marker: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            settle_ms: 200,
            retries: 2,
            case_timeout_ms: None,
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
        }
    }
}

impl TransferConfig {
    /// Build engine settings, compiling the error marker.
    pub fn settings(&self) -> ConfigResult<TransferSettings> {
        let marker = Regex::new(&self.error_marker)
            .map_err(|e| ConfigError::invalid("transfer.error_marker", e.to_string()))?;
        let mut settings = TransferSettings::new(Duration::from_millis(self.settle_ms), self.retries)
            .with_error_marker(marker);
        if let Some(ms) = self.case_timeout_ms {
            settings = settings.with_case_timeout(Duration::from_millis(ms));
        }
        Ok(settings)
    }
}

/// Case selection section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Only run cases at these baud rates (all when empty)
    pub bauds: Vec<u32>,
    /// Only run cases whose id matches this regex
    pub id_pattern: Option<String>,
}

impl SelectionConfig {
    pub fn filter(&self) -> ConfigResult<CaseFilter> {
        let mut filter = CaseFilter::new().with_bauds(self.bauds.clone());
        if let Some(pattern) = &self.id_pattern {
            let pattern = Regex::new(pattern)
                .map_err(|e| ConfigError::invalid("selection.id_pattern", e.to_string()))?;
            filter = filter.with_id_pattern(pattern);
        }
        Ok(filter)
    }
}

/// Live serial port section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: Option<String>,
    /// Per-call I/O timeout in milliseconds
    pub io_timeout_ms: u64,
    /// Open a fresh connection for every case
    pub reopen_per_case: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            port: None,
            io_timeout_ms: 1000,
            reopen_per_case: false,
        }
    }
}

impl LiveConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn policy(&self) -> ConnectionPolicy {
        if self.reopen_per_case {
            ConnectionPolicy::ReopenPerCase
        } else {
            ConnectionPolicy::Reuse
        }
    }
}

/// Simulator section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulator executable
    pub command: Option<String>,
    /// Arguments, with `{stimulus}`, `{response}`, `{baud}`,
    /// `{local_clock_hz}` and `{remote_clock_hz}` placeholders
    pub args: Vec<String>,
    /// Directory for artifacts; the simulator runs here
    pub working_dir: PathBuf,
    pub stimulus_file: PathBuf,
    pub response_file: PathBuf,
    /// Testbench log file, relative to `working_dir`
    pub log_file: Option<PathBuf>,
    /// Limit on one simulator run in milliseconds
    pub run_timeout_ms: u64,
    /// Leave artifacts on disk after each case
    pub keep_artifacts: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            working_dir: PathBuf::from("sim_build"),
            stimulus_file: PathBuf::from("stimulus.txt"),
            response_file: PathBuf::from("response.txt"),
            log_file: None,
            run_timeout_ms: 600_000,
            keep_artifacts: false,
        }
    }
}

impl SimulationConfig {
    /// Build simulator settings.
    ///
    /// Fails with `ConfigError::Missing` when no command is configured.
    pub fn settings(&self) -> ConfigResult<SimulatorSettings> {
        let command = self
            .command
            .clone()
            .ok_or_else(|| ConfigError::missing("simulation.command"))?;
        let mut settings = SimulatorSettings::new(command, self.working_dir.clone())
            .with_args(self.args.clone())
            .with_run_timeout(Duration::from_millis(self.run_timeout_ms));
        settings.stimulus_file = self.stimulus_file.clone();
        settings.response_file = self.response_file.clone();
        settings.log_file = self.log_file.clone();
        settings.keep_artifacts = self.keep_artifacts;
        Ok(settings)
    }
}

/// Binary-only; library users install their own subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    #[default]
    Pretty,
    Compact,
}

/// Report section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Write the suite result as JSON here
    pub output: Option<PathBuf>,
}
