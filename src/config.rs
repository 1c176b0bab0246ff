//! Configuration module for pingkeeper.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors detected by [`MonitorConfig::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("request timeout ({request:?}) must exceed connect timeout ({connect:?})")]
    TimeoutOrder { connect: Duration, request: Duration },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Monitoring configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory holding both state files (default: ".")
    pub data_dir: PathBuf,
    /// Endpoint list file name (default: "projects.json")
    pub projects_file: String,
    /// Stats table file name (default: "project_stats.json")
    pub stats_file: String,
    /// Wait between two sweeps (default: 300s)
    pub sweep_interval: Duration,
    /// Wait between consecutive probes inside a sweep (default: 2s)
    pub probe_spacing: Duration,
    /// Wait between consecutive probes of a manual ping-all (default: 1s)
    pub manual_spacing: Duration,
    /// Bound on the DNS pre-check (default: 10s)
    pub dns_timeout: Duration,
    /// HTTP connect timeout (default: 15s)
    pub connect_timeout: Duration,
    /// HTTP total timeout, must exceed the connect timeout (default: 20s)
    pub request_timeout: Duration,
    /// Skip TLS certificate verification (default: false)
    pub accept_invalid_certs: bool,
    /// Start the sweep loop when the daemon boots (default: true)
    pub autostart: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            projects_file: "projects.json".to_string(),
            stats_file: "project_stats.json".to_string(),
            sweep_interval: Duration::from_secs(300),
            probe_spacing: Duration::from_secs(2),
            manual_spacing: Duration::from_secs(1),
            dns_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(20),
            accept_invalid_certs: false,
            autostart: true,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PINGKEEPER_DATA_DIR`: state directory (default: ".")
    /// - `PINGKEEPER_PROJECTS_FILE` / `PINGKEEPER_STATS_FILE`: state file names
    /// - `PINGKEEPER_SWEEP_INTERVAL_SECS`: cadence between sweeps (default: 300)
    /// - `PINGKEEPER_PROBE_SPACING_SECS`: delay between probes in a sweep (default: 2)
    /// - `PINGKEEPER_MANUAL_SPACING_SECS`: delay between manual probes (default: 1)
    /// - `PINGKEEPER_DNS_TIMEOUT_SECS`, `PINGKEEPER_CONNECT_TIMEOUT_SECS`,
    ///   `PINGKEEPER_REQUEST_TIMEOUT_SECS`: probe timeouts (10/15/20)
    /// - `PINGKEEPER_ACCEPT_INVALID_CERTS`: skip certificate checks (default: false)
    /// - `PINGKEEPER_AUTOSTART`: start monitoring on boot (default: true)
    ///
    /// Values that fail to parse are ignored.
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(dir) = env::var("PINGKEEPER_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(name) = env::var("PINGKEEPER_PROJECTS_FILE") {
            cfg.projects_file = name;
        }
        if let Ok(name) = env::var("PINGKEEPER_STATS_FILE") {
            cfg.stats_file = name;
        }

        if let Some(secs) = parse_var::<u64>("PINGKEEPER_SWEEP_INTERVAL_SECS") {
            cfg.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("PINGKEEPER_PROBE_SPACING_SECS") {
            cfg.probe_spacing = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("PINGKEEPER_MANUAL_SPACING_SECS") {
            cfg.manual_spacing = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("PINGKEEPER_DNS_TIMEOUT_SECS") {
            cfg.dns_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("PINGKEEPER_CONNECT_TIMEOUT_SECS") {
            cfg.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("PINGKEEPER_REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = parse_var::<bool>("PINGKEEPER_ACCEPT_INVALID_CERTS") {
            cfg.accept_invalid_certs = flag;
        }
        if let Some(flag) = parse_var::<bool>("PINGKEEPER_AUTOSTART") {
            cfg.autostart = flag;
        }

        cfg
    }

    /// Check the relationships between settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Zero("sweep interval"));
        }
        if self.dns_timeout.is_zero() {
            return Err(ConfigError::Zero("dns timeout"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Zero("connect timeout"));
        }
        if self.request_timeout <= self.connect_timeout {
            return Err(ConfigError::TimeoutOrder {
                connect: self.connect_timeout,
                request: self.request_timeout,
            });
        }
        Ok(())
    }

    /// Full path of the endpoint list file.
    pub fn projects_path(&self) -> PathBuf {
        self.data_dir.join(&self.projects_file)
    }

    /// Full path of the stats table file.
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join(&self.stats_file)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
