//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Read KEY=VALUE pairs from an env file.
    ///
    /// The file is parsed, not exported: values are returned so the caller can
    /// layer them beneath the real process environment. A missing file is
    /// only an error when the path was given explicitly.
    pub fn load_env_file(path: &Path, explicit: bool, debug: bool) -> Result<HashMap<String, String>> {
        if !path.exists() {
            if explicit {
                return Err(AppError::config(format!("Env file not found: {}", path.display())));
            }
            if debug {
                println!("No {} file found, using environment and CLI arguments", path.display());
            }
            return Ok(HashMap::new());
        }

        // from_path_iter is the only dotenv entry point that parses without
        // exporting into the process environment
        #[allow(deprecated)]
        let iter = dotenv::from_path_iter(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item
                .map_err(|e| AppError::config(format!("Failed to parse {}: {}", path.display(), e)))?;
            vars.insert(key, value);
        }

        if debug {
            println!("Loaded {} variables from {}", vars.len(), path.display());
        }

        Ok(vars)
    }

    /// Validate a single environment variable value
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "INTERVAL" => {
                let interval: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid INTERVAL value '{}': {}", value, e)))?;
                if interval == 0 {
                    return Err(AppError::config("INTERVAL must be greater than 0"));
                }
            }
            "IPS" => {
                if crate::models::config::parse_target_list(value).is_empty() {
                    return Err(AppError::config("IPS must name at least one target"));
                }
            }
            "API_HOST" => {
                if value.is_empty() {
                    return Err(AppError::config("API_HOST cannot be empty"));
                }
            }
            "API_PORT" => {
                let port: u16 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid API_PORT value '{}': {}", value, e)))?;
                if port == 0 {
                    return Err(AppError::config("API_PORT must be greater than 0"));
                }
            }
            "LISTEN_ADDR" => {
                value.parse::<Ipv4Addr>()
                    .map_err(|e| AppError::config(format!("Invalid LISTEN_ADDR value '{}': {}", value, e)))?;
            }
            "PROBE_TIMEOUT" => {
                let timeout: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT value '{}': {}", value, e)))?;
                if timeout == 0 || timeout > crate::defaults::MAX_PROBE_TIMEOUT_SECS {
                    return Err(AppError::config(format!(
                        "PROBE_TIMEOUT must be between 1 and {}, got: {}",
                        crate::defaults::MAX_PROBE_TIMEOUT_SECS,
                        timeout
                    )));
                }
            }
            "PRIVILEGED" | "PUBLISH_FAILURES" | "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("INTERVAL", "Seconds between probe cycles (required)", "30"),
            ("IPS", "Comma-separated targets to probe (required)", "127.0.0.1,192.168.1.1"),
            ("API_HOST", "Collector host", crate::defaults::DEFAULT_API_HOST),
            ("API_PORT", "Collector port", crate::defaults::DEFAULT_API_PORT),
            ("LISTEN_ADDR", "Local IPv4 address for the probe socket", "0.0.0.0"),
            ("PROBE_TIMEOUT", "Echo reply timeout in seconds (1-60)", "5"),
            ("PRIVILEGED", "Use raw ICMP sockets", "true"),
            ("PUBLISH_FAILURES", "Publish zero-latency samples for failed probes", "false"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Describe the current value of every supported variable.
    pub fn display_env_status<F>(lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut status = String::from("Current Values:\n\n");
        for (var, _, _) in Self::get_supported_env_vars() {
            let line = match lookup(var) {
                None => format!("  {:<18} (unset)\n", var),
                Some(value) => match Self::validate_env_var(var, &value) {
                    Ok(()) => format!("  {:<18} {}\n", var, value),
                    Err(e) => format!("  {:<18} {} [invalid: {}]\n", var, value, e),
                },
            };
            status.push_str(&line);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_env_file_reads_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "INTERVAL=10").unwrap();
        writeln!(file, "IPS=127.0.0.1,127.0.0.2").unwrap();

        let vars = EnvManager::load_env_file(file.path(), true, false).unwrap();
        assert_eq!(vars.get("INTERVAL").map(String::as_str), Some("10"));
        assert_eq!(vars.get("IPS").map(String::as_str), Some("127.0.0.1,127.0.0.2"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_load_env_file_rejects_malformed_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "INTERVAL=10").unwrap();
        writeln!(file, "this is not an assignment").unwrap();

        let err = EnvManager::load_env_file(file.path(), true, false).unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_load_env_file_does_not_export() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ICMP_REPORTER_TEST_ONLY_VAR=1").unwrap();

        EnvManager::load_env_file(file.path(), true, false).unwrap();
        assert!(std::env::var("ICMP_REPORTER_TEST_ONLY_VAR").is_err());
    }

    #[test]
    fn test_missing_default_env_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let vars = EnvManager::load_env_file(&dir.path().join(".env"), false, false).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_missing_explicit_env_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = EnvManager::load_env_file(&dir.path().join("prod.env"), true, false).unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("prod.env"));
    }

    #[test]
    fn test_env_manager_validate_env_var() {
        assert!(EnvManager::validate_env_var("INTERVAL", "5").is_ok());
        assert!(EnvManager::validate_env_var("IPS", "127.0.0.1, example.com").is_ok());
        assert!(EnvManager::validate_env_var("API_PORT", "8080").is_ok());
        assert!(EnvManager::validate_env_var("LISTEN_ADDR", "10.0.0.1").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT", "60").is_ok());
        assert!(EnvManager::validate_env_var("PRIVILEGED", "false").is_ok());
        assert!(EnvManager::validate_env_var("SOMETHING_ELSE", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("INTERVAL", "0").is_err());
        assert!(EnvManager::validate_env_var("INTERVAL", "5s").is_err());
        assert!(EnvManager::validate_env_var("IPS", " , ").is_err());
        assert!(EnvManager::validate_env_var("API_HOST", "").is_err());
        assert!(EnvManager::validate_env_var("API_PORT", "70000").is_err());
        assert!(EnvManager::validate_env_var("LISTEN_ADDR", "::1").is_err());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT", "61").is_err());
        assert!(EnvManager::validate_env_var("PUBLISH_FAILURES", "yes").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();

        assert!(help.contains("Supported Environment Variables:"));
        for (var, _, _) in EnvManager::get_supported_env_vars() {
            assert!(help.contains(var));
        }
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_display_env_status() {
        let status = EnvManager::display_env_status(|key| match key {
            "INTERVAL" => Some("5".to_string()),
            "API_PORT" => Some("http".to_string()),
            _ => None,
        });

        assert!(status.contains("INTERVAL"));
        assert!(status.contains("(unset)"));
        assert!(status.contains("[invalid:"));
    }
}
