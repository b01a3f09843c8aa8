//! Narrowing a generated matrix down to the cases a run should execute.

use super::case::TestCase;
use regex::Regex;

/// Keeps cases whose baud rate and id match.
///
/// An empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    bauds: Vec<u32>,
    id_pattern: Option<Regex>,
}

impl CaseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep cases running at one of `bauds`.
    pub fn with_bauds(mut self, bauds: Vec<u32>) -> Self {
        self.bauds = bauds;
        self
    }

    /// Only keep cases whose id matches `pattern`.
    pub fn with_id_pattern(mut self, pattern: Regex) -> Self {
        self.id_pattern = Some(pattern);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bauds.is_empty() && self.id_pattern.is_none()
    }

    pub fn matches(&self, case: &TestCase) -> bool {
        let baud_ok = self.bauds.is_empty() || self.bauds.contains(&case.config().baud);
        let id_ok = self
            .id_pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(case.id()));
        baud_ok && id_ok
    }

    /// Drop non-matching cases, keeping generation order.
    pub fn apply(&self, cases: Vec<TestCase>) -> Vec<TestCase> {
        if self.is_empty() {
            return cases;
        }
        cases.into_iter().filter(|case| self.matches(case)).collect()
    }
}
