//! Configuration data model and validation

use crate::error::{AppError, Result};
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Main application configuration
///
/// Loaded once at startup and shared read-only by every cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds to sleep between cycles; zero means "not configured"
    #[serde(default)]
    pub interval_seconds: u64,

    /// Targets to probe, in order
    #[serde(default)]
    pub targets: Vec<String>,

    /// Collector host name or address
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Collector port
    #[serde(default = "default_api_port")]
    pub api_port: String,

    /// Local address the probe socket binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: Ipv4Addr,

    /// Read deadline for a single probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_seconds: u64,

    /// Use raw sockets (true) or unprivileged datagram ICMP sockets (false)
    #[serde(default = "default_privileged")]
    pub privileged: bool,

    /// Publish zero-latency samples for probes that got no echo reply
    #[serde(default = "default_publish_failures")]
    pub publish_failures: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_seconds: 0,
            targets: Vec::new(),
            api_host: default_api_host(),
            api_port: default_api_port(),
            listen_addr: default_listen_addr(),
            probe_timeout_seconds: default_probe_timeout_secs(),
            privileged: default_privileged(),
            publish_failures: default_publish_failures(),
            enable_color: default_enable_color(),
            log_format: LogFormat::default(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Get the poll interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Get the probe read deadline as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    /// Full URL of the collector endpoint
    pub fn collector_url(&self) -> Result<url::Url> {
        let raw = format!(
            "http://{}:{}{}",
            self.api_host,
            self.api_port,
            crate::defaults::COLLECTOR_PATH
        );
        url::Url::parse(&raw)
            .map_err(|e| AppError::config(format!("Invalid collector endpoint '{}': {}", raw, e)))
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.interval_seconds == 0 {
            return Err(AppError::config("INTERVAL is required and must be a positive number of seconds"));
        }

        if self.targets.is_empty() {
            return Err(AppError::config("IPS is required: provide at least one target address"));
        }

        if self.api_host.trim().is_empty() {
            return Err(AppError::config("API_HOST cannot be empty"));
        }

        match self.api_port.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(AppError::config(format!("Invalid API_PORT value '{}'", self.api_port)));
            }
            Ok(_) => {}
        }

        self.collector_url()?;

        if self.probe_timeout_seconds == 0 {
            return Err(AppError::config("Probe timeout must be greater than 0"));
        }

        if self.probe_timeout_seconds > crate::defaults::MAX_PROBE_TIMEOUT_SECS {
            return Err(AppError::config(format!(
                "Probe timeout cannot exceed {} seconds",
                crate::defaults::MAX_PROBE_TIMEOUT_SECS
            )));
        }

        Ok(())
    }

    /// Merge values from an arbitrary variable source.
    ///
    /// Unset variables leave the current value in place; set but malformed
    /// ones are configuration errors.
    pub fn merge_from_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = lookup("INTERVAL") {
            self.interval_seconds = interval.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid INTERVAL value '{}': {}", interval, e)))?;
        }

        if let Some(ips) = lookup("IPS") {
            self.targets = parse_target_list(&ips);
        }

        if let Some(api_host) = lookup("API_HOST") {
            self.api_host = api_host.trim().to_string();
        }

        if let Some(api_port) = lookup("API_PORT") {
            self.api_port = api_port.trim().to_string();
        }

        if let Some(listen_addr) = lookup("LISTEN_ADDR") {
            self.listen_addr = listen_addr.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid LISTEN_ADDR value '{}': {}", listen_addr, e)))?;
        }

        if let Some(timeout) = lookup("PROBE_TIMEOUT") {
            self.probe_timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT value '{}': {}", timeout, e)))?;
        }

        if let Some(privileged) = lookup("PRIVILEGED") {
            self.privileged = privileged.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PRIVILEGED value '{}': {}", privileged, e)))?;
        }

        if let Some(publish_failures) = lookup("PUBLISH_FAILURES") {
            self.publish_failures = publish_failures.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PUBLISH_FAILURES value '{}': {}", publish_failures, e)))?;
        }

        if let Some(enable_color) = lookup("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Split a comma-separated target list, dropping blanks.
pub fn parse_target_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Default value functions for serde
fn default_api_host() -> String {
    crate::defaults::DEFAULT_API_HOST.to_string()
}

fn default_api_port() -> String {
    crate::defaults::DEFAULT_API_PORT.to_string()
}

fn default_listen_addr() -> Ipv4Addr {
    crate::defaults::DEFAULT_LISTEN_ADDR
}

fn default_probe_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_privileged() -> bool {
    crate::defaults::DEFAULT_PRIVILEGED
}

fn default_publish_failures() -> bool {
    crate::defaults::DEFAULT_PUBLISH_FAILURES
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
