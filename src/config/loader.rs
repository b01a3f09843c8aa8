//! Locating the configuration file and layering environment overrides on it.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const ENV_PREFIX: &str = "UART_CONFORMANCE";
const CONFIG_FILE_NAME: &str = "uart-conformance.toml";
const APP_DIR_NAME: &str = "uart-conformance";

/// Explicit configuration file, checked before any standard location.
pub const CONFIG_PATH_ENV: &str = "UART_CONFORMANCE_CONFIG";

/// A configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    source: Option<PathBuf>,
    config: Config,
}

impl ConfigLoader {
    /// Load from the first file [`locate_config_file`] finds, or from
    /// defaults, then apply environment overrides and validate.
    pub fn load() -> ConfigResult<Self> {
        match locate_config_file() {
            Some(path) => Self::load_from(path),
            None => Self::defaults(),
        }
    }

    /// Load a specific file, then apply environment overrides and validate.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::finish(Some(path), config)
    }

    /// Built-in defaults with environment overrides.
    pub fn defaults() -> ConfigResult<Self> {
        Self::finish(None, Config::default())
    }

    /// Wrap a configuration as is, without overrides or validation.
    pub fn from_config(config: Config) -> Self {
        Self {
            source: None,
            config,
        }
    }

    fn finish(source: Option<PathBuf>, mut config: Config) -> ConfigResult<Self> {
        apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(Self { source, config })
    }

    /// File the configuration was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(&self.config)?;
        let write_error = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, text).map_err(write_error)
    }
}

/// First existing file among `$UART_CONFORMANCE_CONFIG`,
/// `./uart-conformance.toml` and [`user_config_file`].
pub fn locate_config_file() -> Option<PathBuf> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    explicit
        .into_iter()
        .chain(Some(PathBuf::from(CONFIG_FILE_NAME)))
        .chain(user_config_file())
        .find(|path| path.is_file())
}

/// Per-user configuration file: `$XDG_CONFIG_HOME` or `~/.config` on Unix,
/// `%APPDATA%` on Windows.
pub fn user_config_file() -> Option<PathBuf> {
    #[cfg(windows)]
    let base = std::env::var_os("APPDATA").map(PathBuf::from);
    #[cfg(not(windows))]
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));

    base.map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

type Apply = fn(&mut Config, &str) -> Result<(), String>;

/// One `UART_CONFORMANCE_<key>` variable, with an optional legacy name
/// consulted when the prefixed one is unset.
struct Override {
    key: &'static str,
    legacy: Option<&'static str>,
    apply: Apply,
}

const OVERRIDES: &[Override] = &[
    Override {
        key: "TRANSFER_SETTLE_MS",
        legacy: None,
        apply: |c, v| number(v).map(|n| c.transfer.settle_ms = n),
    },
    Override {
        key: "TRANSFER_RETRIES",
        legacy: None,
        apply: |c, v| number(v).map(|n| c.transfer.retries = n),
    },
    Override {
        key: "TRANSFER_CASE_TIMEOUT_MS",
        legacy: None,
        apply: |c, v| number(v).map(|n| c.transfer.case_timeout_ms = Some(n)),
    },
    Override {
        key: "TRANSFER_ERROR_MARKER",
        legacy: None,
        apply: |c, v| {
            c.transfer.error_marker = v.to_string();
            Ok(())
        },
    },
    Override {
        key: "LIVE_PORT",
        legacy: Some("TEST_PORT"),
        apply: |c, v| {
            c.live.port = Some(v.trim().to_string());
            Ok(())
        },
    },
    Override {
        key: "LIVE_IO_TIMEOUT_MS",
        legacy: None,
        apply: |c, v| number(v).map(|n| c.live.io_timeout_ms = n),
    },
    Override {
        key: "LIVE_REOPEN_PER_CASE",
        legacy: None,
        apply: |c, v| flag(v).map(|b| c.live.reopen_per_case = b),
    },
    Override {
        key: "SELECTION_BAUDS",
        legacy: Some("TEST_BAUD"),
        apply: |c, v| {
            c.selection.bauds = v
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(number::<u32>)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(())
        },
    },
    Override {
        key: "SELECTION_ID_PATTERN",
        legacy: None,
        apply: |c, v| {
            c.selection.id_pattern = Some(v.to_string());
            Ok(())
        },
    },
    Override {
        key: "SIMULATION_COMMAND",
        legacy: None,
        apply: |c, v| {
            c.simulation.command = Some(v.to_string());
            Ok(())
        },
    },
    Override {
        key: "SIMULATION_WORKING_DIR",
        legacy: None,
        apply: |c, v| {
            c.simulation.working_dir = PathBuf::from(v);
            Ok(())
        },
    },
    Override {
        key: "SIMULATION_RUN_TIMEOUT_MS",
        legacy: None,
        apply: |c, v| number(v).map(|n| c.simulation.run_timeout_ms = n),
    },
    Override {
        key: "SIMULATION_KEEP_ARTIFACTS",
        legacy: None,
        apply: |c, v| flag(v).map(|b| c.simulation.keep_artifacts = b),
    },
    Override {
        key: "LOGGING_LEVEL",
        legacy: None,
        apply: |c, v| {
            c.logging.level = v.to_string();
            Ok(())
        },
    },
    Override {
        key: "LOGGING_FORMAT",
        legacy: None,
        apply: |c, v| {
            c.logging.format = match v.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                _ => return Err("expected json, pretty or compact".to_string()),
            };
            Ok(())
        },
    },
    Override {
        key: "REPORT_OUTPUT",
        legacy: None,
        apply: |c, v| {
            c.report.output = Some(PathBuf::from(v));
            Ok(())
        },
    },
];

fn number<T: FromStr>(value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| "expected a non-negative number".to_string())
}

fn flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

/// Apply every override `lookup` has a value for.
fn apply_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    for entry in OVERRIDES {
        let var = format!("{ENV_PREFIX}_{}", entry.key);
        let found = match lookup(&var) {
            Some(value) => Some((var, value)),
            None => entry
                .legacy
                .and_then(|name| lookup(name).map(|value| (name.to_string(), value))),
        };

        if let Some((var, value)) = found {
            debug!(%var, "applying environment override");
            (entry.apply)(config, &value).map_err(|message| ConfigError::Env {
                var,
                value,
                message,
            })?;
        }
    }
    Ok(())
}
