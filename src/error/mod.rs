//! Error handling for the latency reporter

pub mod probe;

pub use probe::ProbeError;

use thiserror::Error;

/// Custom error types for the latency reporter
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Delivering a sample to the collector failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new publish error
    pub fn publish<S: Into<String>>(message: S) -> Self {
        Self::Publish(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Publish(_) => "PUBLISH",
            Self::Network(_) => "NETWORK",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the driver keeps running after this error.
    ///
    /// Only startup problems are fatal; everything that happens inside a
    /// cycle is logged and the next cycle is the retry.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Internal(_) => true,
            Self::Publish(_) | Self::Network(_) | Self::Timeout(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::Publish(_) => 2,  // Network issues
            Self::Timeout(_) => 3,
            Self::Internal(_) => 99,  // Internal/unexpected errors
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::Publish(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::publish(format!("JSON serialization error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else {
            Self::publish(error.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::internal(format!("Blocking task failed: {}", error))
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = AppError::config("Invalid interval");
        assert_eq!(config_err.category(), "CONFIG");
        assert!(config_err.is_fatal());
        assert_eq!(config_err.exit_code(), 1);

        let publish_err = AppError::publish("Connection refused");
        assert_eq!(publish_err.category(), "PUBLISH");
        assert!(!publish_err.is_fatal());
        assert_eq!(publish_err.exit_code(), 2);

        let internal_err = AppError::internal("boom");
        assert_eq!(internal_err.exit_code(), 99);
    }

    #[tokio::test]
    async fn test_panicked_task_converts_to_internal() {
        let join_err = tokio::task::spawn_blocking(|| panic!("socket exploded"))
            .await
            .unwrap_err();
        let app_err: AppError = join_err.into();

        assert_eq!(app_err.category(), "INTERNAL");
        assert_eq!(app_err.exit_code(), 99);
        assert!(app_err.to_string().starts_with("Internal error: Blocking task failed"));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::config("INTERVAL is required");
        assert_eq!(err.to_string(), "Configuration error: INTERVAL is required");
    }

    #[test]
    fn test_format_for_console_plain() {
        let err = AppError::timeout("collector did not answer");
        assert_eq!(err.format_for_console(false), "[TIMEOUT] Timeout error: collector did not answer");
    }
}
