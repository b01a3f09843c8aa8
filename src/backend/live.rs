//! Live hardware backend.
//!
//! Wraps the `serialport` crate's `SerialPort` trait. The channel is always
//! opened 8N1 without flow control; only the baud rate comes from the case.

use super::error::BackendError;
use super::traits::TransportBackend;
use crate::matrix::ChannelConfig;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// Serial port connected to a device running the loopback design.
pub struct LiveBackend {
    /// System path of the port, e.g. "/dev/ttyUSB0" or "COM4".
    port_name: String,
    /// Read/write timeout passed to the OS driver.
    io_timeout: Duration,
    port: Option<Box<dyn serialport::SerialPort>>,
    config: Option<ChannelConfig>,
}

impl LiveBackend {
    /// Create a backend for the given port; nothing is opened yet.
    ///
    /// # Example
    /// ```no_run
    /// use uart_conformance::backend::{LiveBackend, TransportBackend};
    /// use uart_conformance::matrix::{ChannelConfig, ClockPair};
    ///
    /// let mut backend = LiveBackend::new("/dev/ttyUSB0");
    /// backend.open(&ChannelConfig::new(115200, ClockPair::default()))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            io_timeout: Duration::from_millis(1000),
            port: None,
            config: None,
        }
    }

    /// Set the driver-level read/write timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, BackendError> {
        self.port.as_mut().ok_or(BackendError::NotOpen)
    }
}

impl TransportBackend for LiveBackend {
    fn name(&self) -> &str {
        &self.port_name
    }

    fn open(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        let port = serialport::new(self.port_name.as_str(), config.baud)
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(self.io_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => BackendError::not_found(self.port_name.as_str()),
                _ => BackendError::connection(self.port_name.as_str(), e.to_string()),
            })?;

        debug!(port = %self.port_name, baud = config.baud, "opened serial port");
        self.port = Some(port);
        self.config = Some(*config);
        Ok(())
    }

    fn reconfigure(&mut self, config: &ChannelConfig) -> Result<(), BackendError> {
        match self.port.as_mut() {
            Some(port) => {
                port.set_baud_rate(config.baud)?;
                self.config = Some(*config);
                Ok(())
            }
            None => self.open(config),
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), BackendError> {
        self.port_mut()?.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        self.port_mut()?.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, BackendError> {
        Ok(self.port_mut()?.bytes_to_read()? as usize)
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>, BackendError> {
        let port = self.port_mut()?;
        let buffered = port.bytes_to_read()? as usize;
        let mut buffer = vec![0u8; buffered.min(max)];
        let mut filled = 0;
        while filled < buffer.len() {
            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }
        buffer.truncate(filled);
        Ok(buffer)
    }

    fn drain(&mut self) -> Result<usize, BackendError> {
        let port = self.port_mut()?;
        let dropped = port.bytes_to_read()? as usize;
        port.clear(serialport::ClearBuffer::Input)?;
        Ok(dropped)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "closed serial port");
        }
        Ok(())
    }
}

impl std::fmt::Debug for LiveBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveBackend")
            .field("port_name", &self.port_name)
            .field("baud", &self.config.map(|c| c.baud))
            .field("open", &self.port.is_some())
            .finish()
    }
}
