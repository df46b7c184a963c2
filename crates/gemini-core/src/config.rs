//! Connection configuration
//!
//! Port settings and protocol pacing, stored as JSON so a rig's settings can
//! live next to its move sequences.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Errors loading or saving a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File couldn't be read or written
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// File isn't valid JSON for the expected type
    #[error("Invalid configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Pacing of the ASCII protocol
///
/// The drive firmware drops characters sent back to back, and needs time to
/// settle after its communication settings change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolTiming {
    /// Pause after each character written
    pub inter_char_delay_ms: u64,
    /// Pause between polls while waiting for a response
    pub poll_interval_ms: u64,
    /// Pause before retrying a failed command
    pub retry_pause_ms: u64,
    /// Pause between consecutive commands of a batch
    pub command_pause_ms: u64,
    /// Wait after changing communication settings before discarding replies
    pub settle_delay_ms: u64,
}

impl ProtocolTiming {
    /// Pause after each character written
    pub fn inter_char_delay(&self) -> Duration {
        Duration::from_millis(self.inter_char_delay_ms)
    }

    /// Pause between response polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pause before a retry
    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    /// Pause between batch commands
    pub fn command_pause(&self) -> Duration {
        Duration::from_millis(self.command_pause_ms)
    }

    /// Wait after a settings block
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            inter_char_delay_ms: 10,
            poll_interval_ms: 1,
            retry_pause_ms: 250,
            command_pause_ms: 250,
            settle_delay_ms: 2000,
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Use the drive's echo to catch and correct transmission errors
    pub check_echo: bool,
    /// Deadline for getting a command's echo right, in milliseconds
    pub write_timeout_ms: u64,
    /// Protocol pacing
    pub timing: ProtocolTiming,
}

impl ConnectionConfig {
    /// Default configuration for the given port
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Deadline for confirming a command's echo
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            check_echo: true,
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
            timing: ProtocolTiming::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert!(config.check_echo);
        assert_eq!(config.write_timeout(), Duration::from_secs(1));
        assert_eq!(config.timing.inter_char_delay(), Duration::from_millis(10));
        assert_eq!(config.timing.settle_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"port_name": "/dev/ttyS1", "timing": {"settle_delay_ms": 0}}"#)
                .unwrap();
        assert_eq!(config.port_name, "/dev/ttyS1");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.timing.settle_delay_ms, 0);
        assert_eq!(config.timing.retry_pause_ms, 250);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gemini.json");

        let mut config = ConnectionConfig::for_port("COM3");
        config.check_echo = false;
        config.save(&path).unwrap();

        let loaded = ConnectionConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ConnectionConfig::load(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
