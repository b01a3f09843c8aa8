//! In-memory loopback backend for tests and dry runs.
//!
//! Provides a `MockBackend` that echoes flushed bytes back to its receive
//! buffer, with knobs to inject the faults the engine has to classify:
//! corrupted bytes, short or long responses, late arrival, broken writes and
//! device-reported errors.

use super::error::BackendError;
use super::traits::TransportBackend;
use crate::matrix::ChannelConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Inner state of the mock, shared between clones.
#[derive(Debug)]
struct MockState {
    config: Option<ChannelConfig>,
    /// Bytes written but not yet flushed.
    tx: Vec<u8>,
    /// Bytes flushed but not yet visible to `bytes_available`.
    in_flight: Vec<u8>,
    /// Bytes ready to read.
    rx: VecDeque<u8>,
    /// Every flushed transmission, in order.
    write_log: Vec<Vec<u8>>,
    echo: bool,
    /// Polls that report nothing new after each flush.
    arrival_delay_polls: u32,
    polls_until_arrival: u32,
    corrupt_index: Option<usize>,
    truncate_to: Option<usize>,
    extra_bytes: Vec<u8>,
    fail_writes: bool,
    fail_open: bool,
    device_log: Option<String>,
    opens: usize,
    reconfigures: usize,
    closes: usize,
    drains: usize,
    reads: usize,
    polls: usize,
    cases_ended: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            config: None,
            tx: Vec::new(),
            in_flight: Vec::new(),
            rx: VecDeque::new(),
            write_log: Vec::new(),
            echo: true,
            arrival_delay_polls: 0,
            polls_until_arrival: 0,
            corrupt_index: None,
            truncate_to: None,
            extra_bytes: Vec::new(),
            fail_writes: false,
            fail_open: false,
            device_log: None,
            opens: 0,
            reconfigures: 0,
            closes: 0,
            drains: 0,
            reads: 0,
            polls: 0,
            cases_ended: 0,
        }
    }
}

/// Scripted loopback channel.
///
/// Clones share state, so a test can keep a handle for inspection while the
/// suite runner owns the backend.
///
/// # Example
/// ```
/// use uart_conformance::backend::{MockBackend, TransportBackend};
/// use uart_conformance::matrix::{ChannelConfig, ClockPair};
///
/// let mut backend = MockBackend::new("MOCK0");
/// backend.open(&ChannelConfig::new(115200, ClockPair::default())).unwrap();
/// backend.write(b"Hello").unwrap();
/// backend.flush().unwrap();
///
/// assert_eq!(backend.bytes_available().unwrap(), 5);
/// assert_eq!(backend.read(16).unwrap(), b"Hello");
/// ```
#[derive(Clone)]
pub struct MockBackend {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a closed loopback mock with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Add stale bytes to the receive buffer.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().rx.extend(data);
    }

    /// Stop echoing; flushed bytes vanish.
    pub fn set_echo(&self, echo: bool) {
        self.state.lock().echo = echo;
    }

    /// Hide each echoed transmission for this many polls.
    pub fn set_arrival_delay(&self, polls: u32) {
        self.state.lock().arrival_delay_polls = polls;
    }

    /// Flip every bit of the byte at `index` of each echoed transmission.
    pub fn corrupt_byte(&self, index: usize) {
        self.state.lock().corrupt_index = Some(index);
    }

    /// Echo at most `len` bytes of each transmission.
    pub fn truncate_echo(&self, len: usize) {
        self.state.lock().truncate_to = Some(len);
    }

    /// Append bytes to each echoed transmission.
    pub fn append_extra(&self, data: &[u8]) {
        self.state.lock().extra_bytes = data.to_vec();
    }

    /// Make every write fail as if the cable was pulled.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make `open` fail as if the device was missing.
    pub fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Expose a device log, as a simulated backend would.
    pub fn set_device_log(&self, log: impl Into<String>) {
        self.state.lock().device_log = Some(log.into());
    }

    /// Copy of every flushed transmission.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Number of bytes currently readable.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().rx.len()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    pub fn reconfigure_count(&self) -> usize {
        self.state.lock().reconfigures
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    pub fn drain_count(&self) -> usize {
        self.state.lock().drains
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().reads
    }

    pub fn poll_count(&self) -> usize {
        self.state.lock().polls
    }

    pub fn cases_ended(&self) -> usize {
        self.state.lock().cases_ended
    }

    /// Baud rate of the current configuration, if open.
    pub fn current_baud(&self) -> Option<u32> {
        self.state.lock().config.map(|c| c.baud)
    }
}

impl MockState {
    fn ensure_open(&self) -> Result<(), BackendError> {
        if self.config.is_some() {
            Ok(())
        } else {
            Err(BackendError::NotOpen)
        }
    }

    fn echo_of(&self, sent: &[u8]) -> Vec<u8> {
        let mut echoed = sent.to_vec();
        if let Some(index) = self.corrupt_index {
            if let Some(byte) = echoed.get_mut(index) {
                *byte ^= 0xFF;
            }
        }
        if let Some(len) = self.truncate_to {
            echoed.truncate(len);
        }
        echoed.extend_from_slice(&self.extra_bytes);
        echoed
    }

    fn land_in_flight(&mut self) {
        let landed = std::mem::take(&mut self.in_flight);
        self.rx.extend(landed);
    }
}

impl TransportBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(BackendError::not_found(self.name.as_str()));
        }
        state.config = Some(*config);
        state.opens += 1;
        Ok(())
    }

    fn reconfigure(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.config = Some(*config);
        state.reconfigures += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().config.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if state.fail_writes {
            return Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        state.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let sent = std::mem::take(&mut state.tx);
        if sent.is_empty() {
            return Ok(());
        }
        if state.echo {
            let echoed = state.echo_of(&sent);
            state.in_flight.extend(echoed);
            state.polls_until_arrival = state.arrival_delay_polls;
            if state.polls_until_arrival == 0 {
                state.land_in_flight();
            }
        }
        state.write_log.push(sent);
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, BackendError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.polls += 1;
        if !state.in_flight.is_empty() {
            if state.polls_until_arrival == 0 {
                state.land_in_flight();
            } else {
                state.polls_until_arrival -= 1;
            }
        }
        Ok(state.rx.len())
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, BackendError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.reads += 1;
        let n = max.min(state.rx.len());
        Ok(state.rx.drain(..n).collect())
    }

    fn drain(&mut self) -> Result<usize, BackendError> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.drains += 1;
        let dropped = state.rx.len() + state.in_flight.len();
        state.rx.clear();
        state.in_flight.clear();
        Ok(dropped)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.config.take().is_some() {
            state.closes += 1;
        }
        Ok(())
    }

    fn diagnostic_log(&self) -> Option<String> {
        self.state.lock().device_log.clone()
    }

    fn end_case(&mut self) {
        let mut state = self.state.lock();
        state.tx.clear();
        state.cases_ended += 1;
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
