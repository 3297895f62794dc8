//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::{config::parse_target_list, Config},
};
use std::collections::HashMap;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let file_vars = self.load_env_file()?;
        self.parse_with(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Build the configuration from an explicit variable source.
    pub fn parse_with<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        config.merge_from_vars(lookup)?;

        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Read the env file, if any, without exporting it
    fn load_env_file(&self) -> Result<HashMap<String, String>> {
        let (path, explicit) = self.cli.env_file_path();
        EnvManager::load_env_file(&path, explicit, self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(interval) = self.cli.interval {
            config.interval_seconds = interval;
        }

        if let Some(ref ips) = self.cli.ips {
            config.targets = parse_target_list(ips);
        }

        if let Some(format) = self.cli.log_format {
            config.log_format = format;
        }

        if self.cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            println!("Applied CLI overrides to configuration");
            println!(
                "Final config: interval={}s, targets={}, probe_timeout={}s",
                config.interval_seconds,
                config.targets.len(),
                config.probe_timeout_seconds
            );
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Interval: {}s", config.interval_seconds));
    summary.push(format!("Targets: {}", config.targets.join(", ")));
    match config.collector_url() {
        Ok(url) => summary.push(format!("Collector: {}", url)),
        Err(_) => summary.push(format!("Collector: {}:{} (invalid)", config.api_host, config.api_port)),
    }
    summary.push(format!("Listen Address: {}", config.listen_addr));
    summary.push(format!("Probe Timeout: {}s", config.probe_timeout_seconds));
    summary.push(format!("Privileged Socket: {}", config.privileged));
    summary.push(format!("Publish Failures: {}", config.publish_failures));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
