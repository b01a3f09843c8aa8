//! Locating the loopback rig for hardware tests.

use uart_conformance::backend::LiveBackend;
use uart_conformance::config::ConfigLoader;

const DEFAULT_RIG_BAUD: u32 = 115200;

/// Port and baud rate of a TX-to-RX loopback.
///
/// Read through the normal configuration overrides, so `TEST_PORT` /
/// `TEST_BAUD` and their `UART_CONFORMANCE_*` equivalents all work.
pub struct LoopbackRig {
    pub port: String,
    pub baud: u32,
    io_timeout_ms: u64,
}

impl LoopbackRig {
    pub fn from_env() -> Option<Self> {
        let config = ConfigLoader::defaults().ok()?.into_config();
        Some(Self {
            port: config.live.port?,
            baud: config
                .selection
                .bauds
                .first()
                .copied()
                .unwrap_or(DEFAULT_RIG_BAUD),
            io_timeout_ms: config.live.io_timeout_ms,
        })
    }

    pub fn backend(&self) -> LiveBackend {
        LiveBackend::new(self.port.as_str())
            .with_io_timeout(std::time::Duration::from_millis(self.io_timeout_ms))
    }
}

pub fn list_ports() {
    match serialport::available_ports() {
        Ok(ports) if !ports.is_empty() => {
            for port in ports {
                println!("  {} ({:?})", port.port_name, port.port_type);
            }
        }
        Ok(_) => println!("  no serial ports detected"),
        Err(e) => println!("  port enumeration failed: {e}"),
    }
}

/// Return early from a test when no loopback port is configured.
#[macro_export]
macro_rules! require_rig {
    () => {
        match $crate::hardware::utils::LoopbackRig::from_env() {
            Some(rig) => rig,
            None => {
                println!("TEST_PORT not set, skipping. Ports on this machine:");
                $crate::hardware::utils::list_ports();
                return;
            }
        }
    };
}
