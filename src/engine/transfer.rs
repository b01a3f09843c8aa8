//! Burst transfer state machine.
//!
//! For every burst of a case the engine writes the payload, waits for the
//! echo with a bounded number of polls, reads it back and compares. The first
//! failing burst decides the case verdict.

use super::compare::first_mismatch;
use super::settings::TransferSettings;
use crate::backend::{BackendError, TransportBackend};
use crate::matrix::TestCase;
use crate::report::{Outcome, TransferResult};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Phases of a case, as logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstPhase {
    Idle,
    Draining,
    Writing,
    Polling,
    Retrying,
    Reading,
    Comparing,
    Done,
}

/// What the poll loop saw before giving up or succeeding.
enum Arrival {
    /// At least a full burst is buffered.
    Ready(usize),
    /// Retry budget spent with this many bytes buffered.
    Short(usize),
    /// Case deadline hit with this many bytes buffered.
    Expired(usize),
}

/// Drives one test case at a time over a [`TransportBackend`].
#[derive(Debug, Clone, Default)]
pub struct BurstTransferEngine {
    settings: TransferSettings,
}

impl BurstTransferEngine {
    pub fn new(settings: TransferSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Run every burst of `case` and classify the outcome.
    ///
    /// The backend must already be open with the case configuration. Backend
    /// errors never escape; they become [`Outcome::TransportFailure`].
    pub fn run_case<B>(&self, backend: &mut B, case: &TestCase) -> TransferResult
    where
        B: TransportBackend + ?Sized,
    {
        let started = Instant::now();
        let mut result = TransferResult::started(case.id());
        trace!(id = case.id(), phase = ?BurstPhase::Idle);
        backend.set_deadline(self.settings.case_timeout.map(|limit| started + limit));

        match self.run_bursts(backend, case, started, &mut result) {
            Ok(()) if result.passed() => self.check_device_log(backend, &mut result),
            Ok(()) => {}
            Err(e) => {
                warn!(id = case.id(), error = %e, "transport failure");
                result.outcome = Outcome::TransportFailure;
                result.detail = Some(e.to_string());
            }
        }

        backend.set_deadline(None);
        result.elapsed = started.elapsed();
        trace!(id = case.id(), phase = ?BurstPhase::Done, outcome = %result.outcome);
        result
    }

    fn run_bursts<B>(
        &self,
        backend: &mut B,
        case: &TestCase,
        started: Instant,
        result: &mut TransferResult,
    ) -> Result<(), BackendError>
    where
        B: TransportBackend + ?Sized,
    {
        trace!(id = case.id(), phase = ?BurstPhase::Draining);
        let stale = backend.drain()?;
        if stale > 0 {
            debug!(id = case.id(), stale, "discarded stale input");
        }

        let size = case.burst_size();
        for burst in 0..case.burst_count() {
            result.failed_burst = Some(burst);
            if self.deadline_passed(started) {
                Self::expire(result);
                return Ok(());
            }

            let payload = case.pattern().payload(size, burst);
            trace!(id = case.id(), burst, phase = ?BurstPhase::Writing, bytes = size);
            result.bytes_expected += size;
            backend.write(&payload)?;
            if let Err(e) = backend.flush() {
                if self.deadline_passed(started) {
                    debug!(id = case.id(), burst, error = %e, "flush cut short by case deadline");
                    Self::expire(result);
                    return Ok(());
                }
                return Err(e);
            }

            let available = match self.await_burst(backend, size, started)? {
                Arrival::Ready(available) => available,
                Arrival::Short(available) => {
                    result.outcome = Outcome::Timeout;
                    result.bytes_received += available;
                    result.detail = Some(format!(
                        "{available} of {size} bytes arrived within {} polls",
                        self.settings.retries + 1
                    ));
                    return Ok(());
                }
                Arrival::Expired(available) => {
                    result.bytes_received += available;
                    Self::expire(result);
                    return Ok(());
                }
            };

            trace!(id = case.id(), burst, phase = ?BurstPhase::Reading, available);
            let received = backend.read(available)?;
            result.bytes_received += received.len();

            trace!(id = case.id(), burst, phase = ?BurstPhase::Comparing);
            if let Some(index) = first_mismatch(&payload, &received) {
                result.outcome = Outcome::Mismatch;
                result.first_mismatch_index = Some(index);
                result.detail = Some(match (payload.get(index), received.get(index)) {
                    (Some(sent), Some(got)) => {
                        format!("sent 0x{sent:02x}, received 0x{got:02x}")
                    }
                    _ => format!("received {} bytes, expected {size}", received.len()),
                });
                return Ok(());
            }

            result.bursts_completed += 1;
            result.failed_burst = None;
        }
        Ok(())
    }

    /// Poll until a full burst is buffered, the retries run out or the case
    /// deadline passes.
    fn await_burst<B>(
        &self,
        backend: &mut B,
        burst_size: usize,
        started: Instant,
    ) -> Result<Arrival, BackendError>
    where
        B: TransportBackend + ?Sized,
    {
        let mut retries_left = self.settings.retries;
        let mut available = 0;
        loop {
            trace!(phase = ?BurstPhase::Polling, retries_left);
            std::thread::sleep(self.settings.settle_delay);
            if self.deadline_passed(started) {
                return Ok(Arrival::Expired(available));
            }

            available = backend.bytes_available()?;
            if available >= burst_size {
                return Ok(Arrival::Ready(available));
            }
            if retries_left == 0 {
                return Ok(Arrival::Short(available));
            }
            retries_left -= 1;
            trace!(phase = ?BurstPhase::Retrying, available, burst_size);
        }
    }

    fn deadline_passed(&self, started: Instant) -> bool {
        self.settings
            .case_timeout
            .is_some_and(|limit| started.elapsed() >= limit)
    }

    fn expire(result: &mut TransferResult) {
        result.outcome = Outcome::Timeout;
        result.detail = Some("case deadline exceeded".to_string());
    }

    fn check_device_log<B>(&self, backend: &B, result: &mut TransferResult)
    where
        B: TransportBackend + ?Sized,
    {
        let Some(log) = backend.diagnostic_log() else {
            return;
        };
        if let Some(line) = self.settings.find_device_error(&log) {
            warn!(id = %result.test_case_id, line, "device reported an error");
            result.outcome = Outcome::DeviceError;
            result.detail = Some(line.trim().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::matrix::{ChannelConfig, ClockPair};
    use crate::pattern::DataPattern;
    use std::time::Duration;

    fn engine() -> BurstTransferEngine {
        BurstTransferEngine::new(TransferSettings::new(Duration::ZERO, 2))
    }

    fn case(pattern: DataPattern, size: usize, count: usize) -> TestCase {
        TestCase::new(
            "engine_case",
            "engine test",
            ChannelConfig::new(115200, ClockPair::default()),
            pattern,
            size,
            count,
        )
        .unwrap()
    }

    fn open_mock() -> MockBackend {
        let mut backend = MockBackend::new("MOCK0");
        backend
            .open(&ChannelConfig::new(115200, ClockPair::default()))
            .unwrap();
        backend
    }

    #[test]
    fn test_clean_loopback_passes() {
        let mut backend = open_mock();
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 64, 3));

        assert_eq!(result.outcome, Outcome::Pass);
        assert_eq!(result.bytes_expected, 192);
        assert_eq!(result.bytes_received, 192);
        assert_eq!(result.bursts_completed, 3);
        assert_eq!(result.failed_burst, None);
        assert_eq!(result.first_mismatch_index, None);
    }

    #[test]
    fn test_payloads_follow_pattern() {
        let mut backend = open_mock();
        let tc = case(DataPattern::random(7), 32, 2);
        engine().run_case(&mut backend, &tc);

        let log = backend.write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], tc.pattern().payload(32, 0));
        assert_eq!(log[1], tc.pattern().payload(32, 1));
    }

    #[test]
    fn test_corrupted_byte_is_mismatch() {
        let mut backend = open_mock();
        backend.corrupt_byte(5);
        let result = engine().run_case(&mut backend, &case(DataPattern::constant(0x55), 16, 4));

        assert_eq!(result.outcome, Outcome::Mismatch);
        assert_eq!(result.first_mismatch_index, Some(5));
        assert_eq!(result.failed_burst, Some(0));
        assert_eq!(result.bursts_completed, 0);
        assert_eq!(result.detail.as_deref(), Some("sent 0x55, received 0xaa"));
        // Fail-fast: later bursts are never sent.
        assert_eq!(backend.write_log().len(), 1);
    }

    #[test]
    fn test_extra_bytes_are_mismatch() {
        let mut backend = open_mock();
        backend.append_extra(&[0xEE]);
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 8, 1));

        assert_eq!(result.outcome, Outcome::Mismatch);
        assert_eq!(result.first_mismatch_index, Some(8));
        assert_eq!(result.bytes_received, 9);
    }

    #[test]
    fn test_short_echo_times_out_without_read() {
        let mut backend = open_mock();
        backend.truncate_echo(10);
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 16, 1));

        assert_eq!(result.outcome, Outcome::Timeout);
        assert_eq!(result.bytes_received, 10);
        assert_eq!(result.failed_burst, Some(0));
        assert_eq!(backend.read_count(), 0);
        assert_eq!(backend.poll_count(), 3);
    }

    #[test]
    fn test_late_arrival_within_retries() {
        let mut backend = open_mock();
        backend.set_arrival_delay(2);
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 16, 2));
        assert_eq!(result.outcome, Outcome::Pass);
    }

    #[test]
    fn test_late_arrival_beyond_retries() {
        let mut backend = open_mock();
        backend.set_arrival_delay(3);
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 16, 1));
        assert_eq!(result.outcome, Outcome::Timeout);
        assert_eq!(result.bytes_received, 0);
    }

    #[test]
    fn test_write_failure_is_transport_failure() {
        let mut backend = open_mock();
        backend.fail_writes(true);
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 16, 1));

        assert_eq!(result.outcome, Outcome::TransportFailure);
        assert_eq!(result.failed_burst, Some(0));
        assert!(result.detail.unwrap().contains("mock write failure"));
    }

    #[test]
    fn test_closed_backend_is_transport_failure() {
        let mut backend = MockBackend::new("MOCK0");
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 16, 1));
        assert_eq!(result.outcome, Outcome::TransportFailure);
        assert_eq!(result.failed_burst, None);
    }

    #[test]
    fn test_stale_input_is_drained() {
        let mut backend = open_mock();
        backend.enqueue_read(&[0xDE, 0xAD]);
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 4, 1));
        assert_eq!(result.outcome, Outcome::Pass);
        assert_eq!(backend.drain_count(), 1);
    }

    #[test]
    fn test_device_log_error() {
        let mut backend = open_mock();
        backend.set_device_log("tx done\n  ERROR: parity fault at byte 3\n");
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 4, 1));

        assert_eq!(result.outcome, Outcome::DeviceError);
        assert_eq!(result.bytes_received, 4);
        assert_eq!(
            result.detail.as_deref(),
            Some("ERROR: parity fault at byte 3")
        );
    }

    #[test]
    fn test_clean_device_log() {
        let mut backend = open_mock();
        backend.set_device_log("tx done\nrx done\n");
        let result = engine().run_case(&mut backend, &case(DataPattern::ByteIndex, 4, 1));
        assert_eq!(result.outcome, Outcome::Pass);
    }

    #[test]
    fn test_case_deadline() {
        let settings = TransferSettings::new(Duration::ZERO, 2).with_case_timeout(Duration::ZERO);
        let mut backend = open_mock();
        let result =
            BurstTransferEngine::new(settings).run_case(&mut backend, &case(DataPattern::ByteIndex, 4, 2));

        assert_eq!(result.outcome, Outcome::Timeout);
        assert_eq!(result.detail.as_deref(), Some("case deadline exceeded"));
        assert!(backend.write_log().is_empty());
    }

    /// Channel whose flush hangs until the case deadline, like a stuck
    /// simulator run.
    #[derive(Debug, Default)]
    struct StalledChannel {
        deadline: Option<Instant>,
        deadlines_seen: Vec<Option<Instant>>,
    }

    impl TransportBackend for StalledChannel {
        fn name(&self) -> &str {
            "stalled"
        }
        fn open(&mut self, _config: &ChannelConfig) -> Result<(), BackendError> {
            Ok(())
        }
        fn is_open(&self) -> bool {
            true
        }
        fn write(&mut self, _data: &[u8]) -> Result<(), BackendError> {
            Ok(())
        }
        fn flush(&mut self) -> Result<(), BackendError> {
            let until = self
                .deadline
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(5));
            std::thread::sleep(until.saturating_duration_since(Instant::now()));
            Err(BackendError::Timeout(Duration::from_secs(5)))
        }
        fn bytes_available(&mut self) -> Result<usize, BackendError> {
            Ok(0)
        }
        fn read(&mut self, _max: usize) -> Result<Vec<u8>, BackendError> {
            Ok(Vec::new())
        }
        fn drain(&mut self) -> Result<usize, BackendError> {
            Ok(0)
        }
        fn close(&mut self) -> Result<(), BackendError> {
            Ok(())
        }
        fn set_deadline(&mut self, deadline: Option<Instant>) {
            self.deadline = deadline;
            self.deadlines_seen.push(deadline);
        }
    }

    #[test]
    fn test_case_deadline_bounds_blocking_flush() {
        let settings =
            TransferSettings::new(Duration::ZERO, 2).with_case_timeout(Duration::from_millis(100));
        let mut backend = StalledChannel::default();

        let result = BurstTransferEngine::new(settings)
            .run_case(&mut backend, &case(DataPattern::ByteIndex, 4, 1));

        assert_eq!(result.outcome, Outcome::Timeout);
        assert_eq!(result.detail.as_deref(), Some("case deadline exceeded"));
        assert!(result.elapsed < Duration::from_secs(2));
        assert_eq!(backend.deadlines_seen.len(), 2);
        assert!(backend.deadlines_seen[0].is_some());
        assert_eq!(backend.deadlines_seen[1], None);
    }
}
