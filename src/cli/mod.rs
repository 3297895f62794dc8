//! Command-line interface

use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// ICMP Latency Reporter - pings hosts on an interval and posts the latency to a collector
#[derive(Parser, Debug, Clone)]
#[command(name = "pinger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Env file to load (defaults to .env in the working directory when present)
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Seconds between probe cycles, overrides INTERVAL
    #[arg(short, long, value_name = "SECS", value_parser = parse_interval)]
    pub interval: Option<u64>,

    /// Comma-separated targets, overrides IPS
    #[arg(long, value_name = "LIST")]
    pub ips: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Log output format
    #[arg(long, value_enum, env = "LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Print supported environment variables and exit
    #[arg(long)]
    pub show_env: bool,
}

impl Cli {
    /// Env file path and whether it was named explicitly
    pub fn env_file_path(&self) -> (PathBuf, bool) {
        match &self.env_file {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(crate::defaults::DEFAULT_ENV_FILE), false),
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }
}

/// Parse interval seconds, rejecting zero and signed or hex forms
fn parse_interval(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid interval: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid interval: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Interval must be greater than 0".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    true
}
