use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{AdbMcpError, Result};
use crate::process::locator::default_adb_program;

/// Name of the configuration file looked up in the user config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Directory under the user config directory holding `config.toml`.
pub const CONFIG_DIR: &str = "adb-mcp";

/// Upper bound for any configured time budget: one day.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Server configuration.
///
/// Controls which adb binary is used and the time budgets for each class of
/// command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// adb program: a bare name searched on `PATH`, or a path.
    pub adb_path: PathBuf,
    /// Budget for device commands, in seconds.
    pub command_timeout_secs: u64,
    /// Budget for Gradle builds, in seconds.
    pub build_timeout_secs: u64,
    /// Time output drains may keep flushing after a timed-out process is killed.
    pub drain_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_program(),
            command_timeout_secs: 30,
            build_timeout_secs: 600,
            drain_grace_ms: 500,
        }
    }
}

impl ServerConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }

    /// Rejects values that would make every command fail immediately.
    pub fn validate(&self) -> Result<()> {
        if self.adb_path.as_os_str().is_empty() {
            return Err(AdbMcpError::Config {
                message: "adb_path must not be empty".to_string(),
            });
        }
        if self.command_timeout_secs == 0 {
            return Err(AdbMcpError::Config {
                message: "command_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.build_timeout_secs == 0 {
            return Err(AdbMcpError::Config {
                message: "build_timeout_secs must be greater than zero".to_string(),
            });
        }
        for (key, value) in [
            ("command_timeout_secs", self.command_timeout_secs),
            ("build_timeout_secs", self.build_timeout_secs),
        ] {
            if value > MAX_TIMEOUT_SECS {
                return Err(AdbMcpError::Config {
                    message: format!("{key} must be at most {MAX_TIMEOUT_SECS} (got {value})"),
                });
            }
        }
        if self.drain_grace_ms > MAX_TIMEOUT_SECS * 1000 {
            return Err(AdbMcpError::Config {
                message: format!(
                    "drain_grace_ms must be at most {} (got {})",
                    MAX_TIMEOUT_SECS * 1000,
                    self.drain_grace_ms
                ),
            });
        }
        Ok(())
    }
}

/// Returns `<user config dir>/adb-mcp/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Parses and validates a TOML configuration document.
pub fn parse_config(contents: &str) -> Result<ServerConfig> {
    let config: ServerConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration.
///
/// An explicit path must exist. Without one, the file in the user config
/// directory is used when present, and defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<ServerConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(ServerConfig::default()),
        },
    };

    let contents = fs::read_to_string(&path).map_err(|e| AdbMcpError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    parse_config(&contents).map_err(|e| AdbMcpError::Config {
        message: format!("failed to parse config file '{}': {}", path.display(), e),
    })
}
