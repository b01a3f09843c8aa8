//! Harness configuration: a TOML file with a section per concern, layered
//! under `UART_CONFORMANCE_<SECTION>_<KEY>` environment variables.
//!
//! Every key has a default, so running without a file executes the full
//! default matrix. [`locate_config_file`] documents where files are looked
//! up. The hardware test variables `TEST_PORT` and `TEST_BAUD` are honored
//! when the prefixed variables are unset.
//!
//! ```rust,no_run
//! use uart_conformance::config::ConfigLoader;
//!
//! let config = ConfigLoader::load()?.into_config();
//! let settings = config.transfer.settings()?;
//! println!("waiting up to {:?} per burst", settings.max_burst_wait());
//! # Ok::<(), uart_conformance::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{locate_config_file, user_config_file, ConfigLoader, CONFIG_PATH_ENV};
pub use schema::{
    Config, LiveConfig, LogFormat, LoggingConfig, ReportConfig, SelectionConfig,
    SimulationConfig, TransferConfig,
};
