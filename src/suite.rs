//! Suite orchestration: channel lifecycle around the per-case engine.

use crate::backend::TransportBackend;
use crate::engine::{BurstTransferEngine, TransferSettings};
use crate::error::{HarnessError, HarnessResult};
use crate::matrix::{ChannelConfig, MatrixAxes, MatrixGenerator, TestCase};
use crate::report::{Reporter, SuiteResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// When the runner opens and closes the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    /// Keep one connection open and reconfigure it when a case needs
    /// different settings.
    #[default]
    Reuse,
    /// Open a fresh connection for every case and close it afterwards.
    ReopenPerCase,
}

/// Releases per-case backend resources on every exit path.
struct CaseScope<'a, B: TransportBackend + ?Sized> {
    backend: &'a mut B,
    policy: ConnectionPolicy,
}

impl<'a, B: TransportBackend + ?Sized> CaseScope<'a, B> {
    fn new(backend: &'a mut B, policy: ConnectionPolicy) -> Self {
        Self { backend, policy }
    }
}

impl<B: TransportBackend + ?Sized> Drop for CaseScope<'_, B> {
    fn drop(&mut self) {
        self.backend.end_case();
        if self.policy == ConnectionPolicy::ReopenPerCase {
            if let Err(e) = self.backend.close() {
                warn!(backend = self.backend.name(), error = %e, "close after case failed");
            }
        }
    }
}

/// Runs a list of cases in order against one backend.
#[derive(Debug, Clone, Default)]
pub struct SuiteRunner {
    engine: BurstTransferEngine,
    policy: ConnectionPolicy,
}

impl SuiteRunner {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            engine: BurstTransferEngine::new(settings),
            policy: ConnectionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConnectionPolicy {
        self.policy
    }

    /// Run every case and collect the verdicts.
    ///
    /// A failing case never stops the suite. The backend is closed when the
    /// run ends, whether it completed or aborted.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Connection` if the channel cannot be opened or
    ///   reconfigured for a case
    pub fn run<B>(&self, cases: &[TestCase], backend: &mut B) -> HarnessResult<SuiteResult>
    where
        B: TransportBackend + ?Sized,
    {
        info!(
            backend = backend.name(),
            cases = cases.len(),
            policy = ?self.policy,
            "starting suite"
        );
        let mut reporter = Reporter::new(cases.len());
        let outcome = self.run_cases(cases, backend, &mut reporter);

        if let Err(e) = backend.close() {
            warn!(backend = backend.name(), error = %e, "closing backend failed");
        }
        outcome?;
        Ok(reporter.finalize())
    }

    fn run_cases<B>(
        &self,
        cases: &[TestCase],
        backend: &mut B,
        reporter: &mut Reporter,
    ) -> HarnessResult<()>
    where
        B: TransportBackend + ?Sized,
    {
        let mut applied: Option<ChannelConfig> = None;
        for case in cases {
            reporter.begin(case);
            self.prepare(backend, case.config(), &mut applied)?;

            let scope = CaseScope::new(&mut *backend, self.policy);
            let result = self.engine.run_case(&mut *scope.backend, case);
            drop(scope);

            reporter.record(case, result)?;
        }
        Ok(())
    }

    /// Make sure the channel is open with `config`.
    fn prepare<B>(
        &self,
        backend: &mut B,
        config: &ChannelConfig,
        applied: &mut Option<ChannelConfig>,
    ) -> HarnessResult<()>
    where
        B: TransportBackend + ?Sized,
    {
        if !backend.is_open() {
            debug!(backend = backend.name(), %config, "opening channel");
            backend
                .open(config)
                .map_err(|e| HarnessError::connection(backend.name(), e))?;
        } else if applied.as_ref() != Some(config) {
            debug!(backend = backend.name(), %config, "reconfiguring channel");
            backend
                .reconfigure(config)
                .map_err(|e| HarnessError::connection(backend.name(), e))?;
        }
        *applied = Some(*config);
        Ok(())
    }
}

/// Generate the matrix for `axes` and run it.
///
/// Without a seed the random patterns differ from run to run; the seed used
/// is logged by the generator.
pub fn run_suite<B>(
    axes: &MatrixAxes,
    seed: Option<u64>,
    backend: &mut B,
    settings: TransferSettings,
    policy: ConnectionPolicy,
) -> HarnessResult<SuiteResult>
where
    B: TransportBackend + ?Sized,
{
    let mut generator = MatrixGenerator::new(axes.clone());
    if let Some(seed) = seed {
        generator = generator.with_seed(seed);
    }
    let cases = generator.generate()?;
    SuiteRunner::new(settings)
        .with_policy(policy)
        .run(&cases, backend)
}
