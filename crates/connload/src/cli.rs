use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use connload_common::{ConfigError, FileConfig, RunConfig};

/// TCP concurrent-connection capacity tester: opens N simultaneous
/// connections, holds them idle for a fixed duration and reports how many
/// the target sustained.
#[derive(Parser, Debug)]
#[command(name = "connload")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target host (default 127.0.0.1)
    #[arg(long)]
    pub host: Option<String>,

    /// Target port (default 8090)
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of concurrent connections to open (default 100)
    #[arg(short, long)]
    pub connections: Option<u32>,

    /// How long to hold the connections open, in seconds (default 30)
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Message pacing interval in seconds; reserved for a future traffic
    /// mode, ignored by the hold-only engine (default 0.0)
    #[arg(long)]
    pub interval: Option<f64>,

    /// Optional YAML scenario file; explicit flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Resolves flags over file values over built-in defaults, then
    /// validates the result.
    pub fn into_config(self) -> Result<RunConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => FileConfig::default(),
        };

        let interval_secs = self
            .interval
            .or(file.load.message_interval_secs)
            .unwrap_or(0.0);
        if !interval_secs.is_finite() || interval_secs < 0.0 {
            return Err(ConfigError::InvalidInterval.into());
        }

        let defaults = RunConfig::default();
        let config = RunConfig {
            host: self.host.or(file.target.host).unwrap_or(defaults.host),
            port: self.port.or(file.target.port).unwrap_or(defaults.port),
            connections: self
                .connections
                .or(file.load.connections)
                .unwrap_or(defaults.connections),
            duration: self
                .duration
                .or(file.load.duration_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.duration),
            message_interval: Duration::from_secs_f64(interval_secs),
            connect_timeout: file
                .timing
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            launch_batch_size: file
                .timing
                .launch_batch_size
                .unwrap_or(defaults.launch_batch_size),
            launch_batch_pause: file
                .timing
                .launch_batch_pause_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.launch_batch_pause),
            launch_join_timeout: file
                .timing
                .launch_join_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.launch_join_timeout),
            progress_interval: file
                .timing
                .progress_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.progress_interval),
            shutdown_grace: file
                .timing
                .shutdown_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
        };
        config.validate()?;
        Ok(config)
    }
}
