use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_CONNECTIONS: u32 = 100;
pub const DEFAULT_DURATION_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("connections must be greater than zero")]
    ZeroConnections,

    #[error("duration must be greater than zero")]
    ZeroDuration,

    #[error("port must be in the range 1-65535")]
    InvalidPort,

    #[error("interval must be a finite, non-negative number of seconds")]
    InvalidInterval,
}

/// On-disk scenario file. Every field is optional so a file can override
/// just the knobs it cares about; anything left unset falls back to the
/// CLI flags and built-in defaults.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FileConfig {
    pub target: TargetSection,
    pub load: LoadSection,
    pub timing: TimingSection,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TargetSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoadSection {
    pub connections: Option<u32>,
    pub duration_secs: Option<u64>,
    /// Reserved for a future message-pacing mode.
    pub message_interval_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TimingSection {
    pub connect_timeout_secs: Option<u64>,
    pub launch_batch_size: Option<u32>,
    pub launch_batch_pause_ms: Option<u64>,
    pub launch_join_timeout_secs: Option<u64>,
    pub progress_interval_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

/// Resolved, validated configuration for one test run. Built once at
/// startup and shared immutably with every worker.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub host: String,
    pub port: u16,
    pub connections: u32,
    pub duration: Duration,
    /// Reserved for a future message-pacing mode; the hold-only engine
    /// ignores it.
    pub message_interval: Duration,
    pub connect_timeout: Duration,
    pub launch_batch_size: u32,
    pub launch_batch_pause: Duration,
    pub launch_join_timeout: Duration,
    pub progress_interval: Duration,
    pub shutdown_grace: Duration,
}

impl RunConfig {
    pub fn target_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connections == 0 {
            return Err(ConfigError::ZeroConnections);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connections: DEFAULT_CONNECTIONS,
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            message_interval: Duration::ZERO,
            connect_timeout: Duration::from_secs(5),
            launch_batch_size: 100,
            launch_batch_pause: Duration::from_millis(100),
            launch_join_timeout: Duration::from_secs(10),
            progress_interval: Duration::from_secs(1),
            // One connect timeout plus slack, so a worker still stuck in
            // its connect window can resolve before the join gives up.
            shutdown_grace: Duration::from_secs(6),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_contract() {
        let config = RunConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8090);
        assert_eq!(config.connections, 100);
        assert_eq!(config.duration, Duration::from_secs(30));
        assert_eq!(config.message_interval, Duration::ZERO);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.launch_batch_size, 100);
        assert_eq!(config.launch_batch_pause, Duration::from_millis(100));
        assert_eq!(config.launch_join_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let config = RunConfig {
            connections: 0,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroConnections)));

        let config = RunConfig {
            duration: Duration::ZERO,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDuration)));

        let config = RunConfig {
            port: 0,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn file_config_parses_partial_yaml() {
        let raw = "target:\n  host: 10.0.0.5\nload:\n  connections: 2000\n";
        let file: FileConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(file.target.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(file.target.port, None);
        assert_eq!(file.load.connections, Some(2000));
        assert!(file.timing.connect_timeout_secs.is_none());
    }

    #[test]
    fn target_addr_joins_host_and_port() {
        let config = RunConfig {
            host: "example.com".to_string(),
            port: 9000,
            ..RunConfig::default()
        };
        assert_eq!(config.target_addr(), "example.com:9000");
    }
}
