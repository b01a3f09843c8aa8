//! Expansion of matrix axes into an ordered list of test cases.

use super::axes::MatrixAxes;
use super::case::{case_id, format_frequency, ChannelConfig, ClockPair, TestCase};
use crate::error::{HarnessError, HarnessResult};
use crate::pattern::{DataPattern, BOUNDARY_VALUES};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::collections::HashMap;
use tracing::debug;

/// Turns [`MatrixAxes`] into test cases.
///
/// Output order is fixed: random data, static data, clock pairs, burst
/// patterns, then explicit cases, each in the order its axis lists values.
/// With an explicit seed the output is fully deterministic.
#[derive(Debug, Clone)]
pub struct MatrixGenerator {
    axes: MatrixAxes,
    seed: Option<u64>,
}

impl MatrixGenerator {
    pub fn new(axes: MatrixAxes) -> Self {
        Self { axes, seed: None }
    }

    /// Fix the seed random patterns are derived from.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn axes(&self) -> &MatrixAxes {
        &self.axes
    }

    /// Expand every axis.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Configuration` if an axis value is invalid or two
    ///   different parameter sets produce the same case id
    pub fn generate(&self) -> HarnessResult<Vec<TestCase>> {
        let seed = self.seed.unwrap_or_else(rand::random);
        debug!(seed, "generating test matrix");

        let mut matrix = MatrixBuilder::new(seed);
        self.random_data(&mut matrix)?;
        self.static_data(&mut matrix)?;
        self.clock_pairs(&mut matrix)?;
        self.bursts(&mut matrix)?;
        self.explicit(&mut matrix)?;

        let cases = matrix.finish();
        debug!(count = cases.len(), "test matrix ready");
        Ok(cases)
    }

    fn random_data(&self, matrix: &mut MatrixBuilder) -> HarnessResult<()> {
        for &baud in &self.axes.random_bauds {
            let size = self.axes.sizes.random_size(baud);
            matrix.push_random(baud, self.axes.default_clocks, size)?;
        }
        Ok(())
    }

    fn static_data(&self, matrix: &mut MatrixBuilder) -> HarnessResult<()> {
        let mut values: Vec<u8> = Vec::new();
        for value in BOUNDARY_VALUES
            .iter()
            .chain(self.axes.static_data.extra_values.iter())
        {
            if !values.contains(value) {
                values.push(*value);
            }
        }

        let clocks = self.axes.default_clocks;
        for &baud in &self.axes.static_data.bauds {
            let size = self.axes.sizes.static_size(baud);
            for &value in &values {
                let config = ChannelConfig::new(baud, clocks);
                let pattern = DataPattern::constant(value);
                let description = format!(
                    "Check UART with a {} clock using a {} baud rate with {} static bytes ({:#04x}).",
                    clock_phrase(clocks),
                    baud,
                    size,
                    value
                );
                let id = case_id(&pattern.label(), &config, size, 1);
                matrix.push(TestCase::new(id, description, config, pattern, size, 1)?)?;
            }
        }
        Ok(())
    }

    fn clock_pairs(&self, matrix: &mut MatrixBuilder) -> HarnessResult<()> {
        let axis = &self.axes.clock_pairs;
        for (i, &a) in axis.candidates.iter().enumerate() {
            for &b in &axis.candidates[i + 1..] {
                if a == b {
                    continue;
                }
                let pair = ClockPair::new(a, b);
                for &baud in &axis.bauds {
                    let size = axis
                        .burst_size
                        .unwrap_or_else(|| self.axes.sizes.random_size(baud));
                    matrix.push_random(baud, pair, size)?;
                    matrix.push_random(baud, pair.swapped(), size)?;
                }
            }
        }
        Ok(())
    }

    fn bursts(&self, matrix: &mut MatrixBuilder) -> HarnessResult<()> {
        for axis in &self.axes.bursts {
            if axis.label.trim().is_empty() {
                return Err(HarnessError::configuration("burst axis label must not be empty"));
            }
            for &baud in &axis.bauds {
                let config = ChannelConfig::new(baud, self.axes.default_clocks);
                let pattern = matrix.seed_pattern(axis.pattern);
                let id = case_id(&axis.label, &config, axis.burst_size, axis.burst_count);
                let description = format!(
                    "{} ({} x {} bytes at {}).",
                    axis.description, axis.burst_count, axis.burst_size, config
                );
                matrix.push(TestCase::new(
                    id,
                    description,
                    config,
                    pattern,
                    axis.burst_size,
                    axis.burst_count,
                )?)?;
            }
        }
        Ok(())
    }

    fn explicit(&self, matrix: &mut MatrixBuilder) -> HarnessResult<()> {
        for extra in &self.axes.explicit {
            let pattern = matrix.seed_pattern(extra.pattern);
            matrix.push(TestCase::new(
                extra.id.clone(),
                extra.description.clone(),
                ChannelConfig::new(extra.baud, extra.clocks),
                pattern,
                extra.burst_size,
                extra.burst_count,
            )?)?;
        }
        Ok(())
    }
}

/// Accumulates cases, dropping exact repeats and rejecting id collisions.
struct MatrixBuilder {
    cases: Vec<TestCase>,
    by_id: HashMap<String, usize>,
    seeds: Pcg64Mcg,
}

impl MatrixBuilder {
    fn new(seed: u64) -> Self {
        Self {
            cases: Vec::new(),
            by_id: HashMap::new(),
            seeds: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    fn seed_pattern(&mut self, pattern: DataPattern) -> DataPattern {
        if pattern.is_random() {
            pattern.reseeded(self.seeds.gen())
        } else {
            pattern
        }
    }

    fn push_random(&mut self, baud: u32, clocks: ClockPair, size: usize) -> HarnessResult<()> {
        let config = ChannelConfig::new(baud, clocks);
        let pattern = self.seed_pattern(DataPattern::random(0));
        let description = format!(
            "Check UART with a {} local clock and a {} remote clock using a {} baud rate with {} random bytes.",
            format_frequency(clocks.local_hz),
            format_frequency(clocks.remote_hz),
            baud,
            size
        );
        let id = case_id(&pattern.label(), &config, size, 1);
        self.push(TestCase::new(id, description, config, pattern, size, 1)?)
    }

    fn push(&mut self, case: TestCase) -> HarnessResult<()> {
        if let Some(&existing) = self.by_id.get(case.id()) {
            if self.cases[existing].parameter_key() == case.parameter_key() {
                debug!(id = case.id(), "dropping repeated case");
                return Ok(());
            }
            return Err(HarnessError::configuration(format!(
                "case id '{}' is produced by two different parameter sets",
                case.id()
            )));
        }
        self.by_id.insert(case.id().to_string(), self.cases.len());
        self.cases.push(case);
        Ok(())
    }

    fn finish(self) -> Vec<TestCase> {
        self.cases
    }
}

fn clock_phrase(clocks: ClockPair) -> String {
    if clocks.local_hz == clocks.remote_hz {
        format_frequency(clocks.local_hz)
    } else {
        format!(
            "{} local / {} remote",
            format_frequency(clocks.local_hz),
            format_frequency(clocks.remote_hz)
        )
    }
}
