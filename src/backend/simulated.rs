//! Simulated testbench backend.
//!
//! Bytes written to the channel are collected until `flush`, which persists
//! them as a stimulus artifact and runs the external simulator to completion.
//! The simulator's response artifact then becomes the receive buffer, and its
//! console output becomes the diagnostic log the engine scans for
//! device-reported errors.
//!
//! Argument placeholders expanded for every run: `{stimulus}`, `{response}`,
//! `{baud}`, `{local_clock_hz}`, `{remote_clock_hz}`. The same values are
//! exported as `UART_STIMULUS`, `UART_RESPONSE`, `UART_BAUD`,
//! `UART_LOCAL_CLOCK_HZ` and `UART_REMOTE_CLOCK_HZ`.

use super::artifact;
use super::error::BackendError;
use super::traits::TransportBackend;
use crate::matrix::ChannelConfig;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Interval between checks on a running simulator.
const RUN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Console capture file written next to the artifacts.
const CONSOLE_LOG_NAME: &str = "simulation.log";

/// How to invoke the simulator and where artifacts live.
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Executable name (searched on `PATH`) or path.
    pub command: String,
    pub args: Vec<String>,
    /// Directory holding the artifacts; the simulator runs here.
    pub working_dir: PathBuf,
    pub stimulus_file: PathBuf,
    pub response_file: PathBuf,
    /// Extra log file the testbench writes, appended to the diagnostic log.
    pub log_file: Option<PathBuf>,
    pub run_timeout: Duration,
    /// Leave artifacts on disk after each case.
    pub keep_artifacts: bool,
}

impl SimulatorSettings {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            stimulus_file: PathBuf::from("stimulus.txt"),
            response_file: PathBuf::from("response.txt"),
            log_file: None,
            run_timeout: Duration::from_secs(600),
            keep_artifacts: false,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn stimulus_path(&self) -> PathBuf {
        self.working_dir.join(&self.stimulus_file)
    }

    pub fn response_path(&self) -> PathBuf {
        self.working_dir.join(&self.response_file)
    }

    fn console_path(&self) -> PathBuf {
        self.working_dir.join(CONSOLE_LOG_NAME)
    }
}

/// Channel backed by runs of an external simulator.
pub struct SimulatedBackend {
    settings: SimulatorSettings,
    config: Option<ChannelConfig>,
    tx: Vec<u8>,
    rx: VecDeque<u8>,
    log: String,
    runs: usize,
    deadline: Option<Instant>,
}

impl SimulatedBackend {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            settings,
            config: None,
            tx: Vec::new(),
            rx: VecDeque::new(),
            log: String::new(),
            runs: 0,
            deadline: None,
        }
    }

    pub fn settings(&self) -> &SimulatorSettings {
        &self.settings
    }

    /// Number of simulator runs since creation.
    pub fn run_count(&self) -> usize {
        self.runs
    }

    fn expand(&self, arg: &str, config: &ChannelConfig) -> String {
        arg.replace("{stimulus}", &self.settings.stimulus_path().to_string_lossy())
            .replace("{response}", &self.settings.response_path().to_string_lossy())
            .replace("{baud}", &config.baud.to_string())
            .replace("{local_clock_hz}", &config.local_clock_hz.to_string())
            .replace("{remote_clock_hz}", &config.remote_clock_hz.to_string())
    }

    /// Run the simulator once over the current stimulus artifact.
    fn run_simulation(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        let response = self.settings.response_path();
        remove_if_present(&response)?;

        let console = File::create(self.settings.console_path())?;
        let args: Vec<String> = self
            .settings
            .args
            .iter()
            .map(|arg| self.expand(arg, config))
            .collect();

        debug!(command = %self.settings.command, ?args, "starting simulator");
        let mut child = Command::new(&self.settings.command)
            .args(&args)
            .current_dir(&self.settings.working_dir)
            .env("UART_STIMULUS", self.settings.stimulus_path())
            .env("UART_RESPONSE", &response)
            .env("UART_BAUD", config.baud.to_string())
            .env("UART_LOCAL_CLOCK_HZ", config.local_clock_hz.to_string())
            .env("UART_REMOTE_CLOCK_HZ", config.remote_clock_hz.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::from(console.try_clone()?))
            .stderr(Stdio::from(console))
            .spawn()
            .map_err(|e| BackendError::simulator(format!("cannot start simulator: {e}")))?;
        self.runs += 1;

        let started = Instant::now();
        let run_deadline = started + self.settings.run_timeout;
        let stop_at = self
            .deadline
            .map_or(run_deadline, |case_deadline| case_deadline.min(run_deadline));
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    stop_child(&mut child);
                    return Err(e.into());
                }
            }
            let now = Instant::now();
            if now >= stop_at {
                let waited = now - started;
                warn!(?waited, "simulator run timed out, killing it");
                stop_child(&mut child);
                self.collect_log();
                return Err(BackendError::Timeout(waited));
            }
            std::thread::sleep(RUN_POLL_INTERVAL.min(stop_at - now));
        };

        self.collect_log();
        if !status.success() {
            warn!(%status, "simulator exited abnormally");
        }

        if !response.exists() {
            return Err(BackendError::simulator(format!(
                "no response artifact at {} ({status})",
                response.display()
            )));
        }
        let received = artifact::read_file(&response)?;
        debug!(bytes = received.len(), "loaded response artifact");
        self.rx.extend(received);
        Ok(())
    }

    fn collect_log(&mut self) {
        let mut log = std::fs::read_to_string(self.settings.console_path()).unwrap_or_default();
        if let Some(extra) = &self.settings.log_file {
            if let Ok(text) = std::fs::read_to_string(self.settings.working_dir.join(extra)) {
                log.push_str(&text);
            }
        }
        self.log.push_str(&log);
    }

    fn remove_artifacts(&self) {
        let mut paths = vec![
            self.settings.stimulus_path(),
            self.settings.response_path(),
            self.settings.console_path(),
        ];
        if let Some(extra) = &self.settings.log_file {
            paths.push(self.settings.working_dir.join(extra));
        }
        for path in paths {
            if let Err(e) = remove_if_present(&path) {
                warn!(path = %path.display(), "could not remove artifact: {e}");
            }
        }
    }
}

/// Kill and reap a simulator so no process outlives its run.
fn stop_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Whether `command` names an existing file or an executable on `PATH`.
fn command_exists(command: &str) -> bool {
    let path = Path::new(command);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                let candidate = dir.join(command);
                candidate.is_file() || candidate.with_extension("exe").is_file()
            })
        })
        .unwrap_or(false)
}

impl TransportBackend for SimulatedBackend {
    fn name(&self) -> &str {
        &self.settings.command
    }

    fn open(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        std::fs::create_dir_all(&self.settings.working_dir).map_err(|e| {
            BackendError::connection(
                self.settings.working_dir.display().to_string(),
                e.to_string(),
            )
        })?;
        if !command_exists(&self.settings.command) {
            return Err(BackendError::connection(
                self.settings.command.as_str(),
                "simulator executable not found",
            ));
        }
        self.config = Some(*config);
        Ok(())
    }

    fn reconfigure(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        if self.config.is_none() {
            return self.open(config);
        }
        // Each run receives the configuration afresh.
        self.config = Some(*config);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), BackendError> {
        if self.config.is_none() {
            return Err(BackendError::NotOpen);
        }
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        let config = self.config.ok_or(BackendError::NotOpen)?;
        if self.tx.is_empty() {
            return Ok(());
        }
        let stimulus = std::mem::take(&mut self.tx);
        artifact::write_file(&self.settings.stimulus_path(), &stimulus)?;
        self.run_simulation(&config)
    }

    fn bytes_available(&mut self) -> Result<usize, BackendError> {
        if self.config.is_none() {
            return Err(BackendError::NotOpen);
        }
        Ok(self.rx.len())
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, BackendError> {
        if self.config.is_none() {
            return Err(BackendError::NotOpen);
        }
        let n = max.min(self.rx.len());
        Ok(self.rx.drain(..n).collect())
    }

    fn drain(&mut self) -> Result<usize, BackendError> {
        if self.config.is_none() {
            return Err(BackendError::NotOpen);
        }
        let dropped = self.rx.len();
        self.rx.clear();
        Ok(dropped)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if self.config.take().is_some() {
            self.end_case();
        }
        Ok(())
    }

    fn diagnostic_log(&self) -> Option<String> {
        Some(self.log.clone())
    }

    fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    fn end_case(&mut self) {
        self.deadline = None;
        self.tx.clear();
        self.rx.clear();
        self.log.clear();
        if !self.settings.keep_artifacts {
            self.remove_artifacts();
        }
    }
}

impl Drop for SimulatedBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for SimulatedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedBackend")
            .field("command", &self.settings.command)
            .field("working_dir", &self.settings.working_dir)
            .field("open", &self.config.is_some())
            .field("runs", &self.runs)
            .finish()
    }
}
