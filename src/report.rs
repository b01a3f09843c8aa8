//! Verdicts and suite reporting.
//!
//! The engine produces one [`TransferResult`] per case; the [`Reporter`]
//! collects them in execution order, logs progress as they arrive, and builds
//! the final [`SuiteResult`].

use crate::error::{HarnessError, HarnessResult};
use crate::matrix::TestCase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Verdict of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    /// Fewer bytes than expected arrived within the retry budget or deadline.
    Timeout,
    /// Byte content or length differed from what was sent.
    Mismatch,
    /// Bytes matched but the device reported a fault.
    DeviceError,
    /// The channel failed mid-case.
    TransportFailure,
}

impl Outcome {
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pass => "pass",
            Self::Timeout => "timeout",
            Self::Mismatch => "mismatch",
            Self::DeviceError => "device error",
            Self::TransportFailure => "transport failure",
        };
        f.write_str(text)
    }
}

/// Outcome of running one case, with the numbers needed to diagnose it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    pub test_case_id: String,
    pub outcome: Outcome,
    /// Bytes transmitted across the bursts attempted.
    pub bytes_expected: usize,
    /// Bytes received across the bursts attempted.
    pub bytes_received: usize,
    /// First differing index within the failing burst.
    pub first_mismatch_index: Option<usize>,
    /// Index of the burst that failed.
    pub failed_burst: Option<usize>,
    pub bursts_completed: usize,
    pub elapsed: Duration,
    pub detail: Option<String>,
}

impl TransferResult {
    /// A fresh result for a case that has not transferred anything yet.
    pub fn started(test_case_id: impl Into<String>) -> Self {
        Self {
            test_case_id: test_case_id.into(),
            outcome: Outcome::Pass,
            bytes_expected: 0,
            bytes_received: 0,
            first_mismatch_index: None,
            failed_burst: None,
            bursts_completed: 0,
            elapsed: Duration::ZERO,
            detail: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}

impl fmt::Display for TransferResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}/{} bytes, {:.2?})",
            self.test_case_id, self.outcome, self.bytes_received, self.bytes_expected, self.elapsed
        )?;
        if let Some(burst) = self.failed_burst {
            write!(f, " at burst {burst}")?;
        }
        if let Some(index) = self.first_mismatch_index {
            write!(f, ", first mismatch at byte {index}")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub timeouts: usize,
    pub mismatches: usize,
    pub device_errors: usize,
    pub transport_failures: usize,
}

impl SuiteSummary {
    fn count(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Timeout => self.timeouts += 1,
            Outcome::Mismatch => self.mismatches += 1,
            Outcome::DeviceError => self.device_errors += 1,
            Outcome::TransportFailure => self.transport_failures += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }
}

/// Final record of a suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<TransferResult>,
    pub summary: SuiteSummary,
}

impl SuiteResult {
    /// True when every case passed.
    pub fn is_success(&self) -> bool {
        self.summary.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransferResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// Result for a case id.
    pub fn get(&self, test_case_id: &str) -> Option<&TransferResult> {
        self.results.iter().find(|r| r.test_case_id == test_case_id)
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> HarnessResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

impl fmt::Display for SuiteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(
            f,
            "Suite {}: {}/{} passed ({} timeouts, {} mismatches, {} device errors, {} transport failures)",
            self.run_id, s.passed, s.total, s.timeouts, s.mismatches, s.device_errors, s.transport_failures
        )?;
        for failure in self.failures() {
            writeln!(f, "  FAIL {failure}")?;
        }
        Ok(())
    }
}

/// Collects results as cases finish.
#[derive(Debug)]
pub struct Reporter {
    total: usize,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    results: Vec<TransferResult>,
    summary: SuiteSummary,
    finalized: Option<SuiteResult>,
}

impl Reporter {
    /// Start a report for a suite of `total` cases.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            results: Vec::with_capacity(total),
            summary: SuiteSummary::default(),
            finalized: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Log that a case is about to run.
    pub fn begin(&self, case: &TestCase) {
        info!(
            case = self.results.len() + 1,
            total = self.total,
            id = case.id(),
            "{}",
            case.description()
        );
    }

    /// Add the result of a case.
    ///
    /// # Errors
    ///
    /// - `HarnessError::ReporterFinalized` once `finalize` has been called
    pub fn record(&mut self, case: &TestCase, result: TransferResult) -> HarnessResult<()> {
        if self.finalized.is_some() {
            return Err(HarnessError::ReporterFinalized);
        }
        let index = self.results.len() + 1;
        if result.passed() {
            info!(
                case = index,
                total = self.total,
                id = case.id(),
                elapsed = ?result.elapsed,
                "pass"
            );
        } else {
            warn!(
                case = index,
                total = self.total,
                id = case.id(),
                outcome = %result.outcome,
                "{result}"
            );
        }
        self.summary.count(result.outcome);
        self.results.push(result);
        Ok(())
    }

    /// Build the suite result. Later calls return the same result.
    pub fn finalize(&mut self) -> SuiteResult {
        if let Some(done) = &self.finalized {
            return done.clone();
        }
        let result = SuiteResult {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            results: std::mem::take(&mut self.results),
            summary: std::mem::take(&mut self.summary),
        };
        info!(
            run_id = %result.run_id,
            passed = result.summary.passed,
            total = result.summary.total,
            "suite finished"
        );
        self.finalized = Some(result.clone());
        result
    }
}
