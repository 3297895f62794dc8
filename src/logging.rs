//! Structured logging for the latency reporter
//!
//! Entries carry a level, a logger name, structured fields and an optional
//! correlation id. Every line written during one probing cycle shares that
//! cycle's id, and every logger built by one [`LoggerFactory`] shares a
//! session id.

use crate::error::{AppError, ProbeError};
use crate::models::{Config, ProbeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Severity of a log entry, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    /// Something about one target went wrong; the cycle continues.
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn paint(&self, text: &str) -> String {
        use colored::Colorize;
        match self {
            LogLevel::Debug => text.cyan().to_string(),
            LogLevel::Info => text.green().to_string(),
            LogLevel::Warn => text.yellow().to_string(),
            LogLevel::Error => text.red().bold().to_string(),
        }
    }
}

/// One structured log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Name of the component that logged
    pub logger: String,
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
    /// Call site, filled in by [`log_debug!`](crate::log_debug)
    pub location: Option<LogLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format
    #[default]
    Console,
    /// One JSON object per line
    Json,
    /// Time, level letter, logger and message
    Compact,
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    cycle_id: Option<String>,
}

/// Cheap to clone; clones share the session and cycle context.
#[derive(Clone)]
pub struct Logger {
    name: String,
    min_level: LogLevel,
    format: LogFormat,
    use_color: bool,
    include_location: bool,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Level, format and color come from the config. `--debug` lowers the
    /// threshold to Debug and adds call sites to console lines.
    pub fn with_config(name: String, config: &Config) -> Self {
        Self {
            name,
            min_level: if config.debug { LogLevel::Debug } else { LogLevel::Info },
            format: config.log_format,
            use_color: config.enable_color,
            include_location: config.debug,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    async fn set_session_id(&self, session_id: String) {
        self.context.write().await.session_id = Some(session_id);
    }

    /// Open a probing cycle. Entries logged until [`end_cycle`](Self::end_cycle)
    /// carry the returned id.
    pub async fn start_cycle(&self, cycle: u64, targets: usize) -> String {
        let cycle_id = Uuid::new_v4().to_string();
        self.context.write().await.cycle_id = Some(cycle_id.clone());

        self.debug(&format!("Starting cycle {}", cycle))
            .correlation_id(&cycle_id)
            .field("cycle", cycle)
            .field("targets", targets)
            .log()
            .await;

        cycle_id
    }

    pub async fn end_cycle(&self, cycle_id: &str) {
        let mut context = self.context.write().await;
        if context.cycle_id.as_deref() == Some(cycle_id) {
            context.cycle_id = None;
        }
    }

    fn entry(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message: message.to_string(),
                logger: self.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.entry(LogLevel::Error, message)
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        {
            let context = self.context.read().await;
            if let Some(session_id) = &context.session_id {
                entry.fields.insert("session_id".to_string(), session_id.clone().into());
            }
            if entry.correlation_id.is_none() {
                entry.correlation_id = context.cycle_id.clone();
            }
        }

        let line = self.render(&entry);
        // Warnings and errors go to stderr
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", line);
        } else {
            let _ = writeln!(io::stdout(), "{}", line);
        }
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.render_console(entry),
            LogFormat::Json => serde_json::to_string(entry)
                .unwrap_or_else(|e| format!("{{\"message\":{:?},\"log_error\":{:?}}}", entry.message, e.to_string())),
            LogFormat::Compact => format!(
                "{} {} {}: {}",
                entry.timestamp.format("%H:%M:%S"),
                &entry.level.as_str()[..1],
                entry.logger,
                entry.message
            ),
        }
    }

    fn render_console(&self, entry: &LogEntry) -> String {
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color { entry.level.paint(&level) } else { level };
        let mut line = format!(
            "{} {} [{}] {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            level,
            entry.logger,
            entry.message
        );

        if let Some(id) = &entry.correlation_id {
            line.push_str(&format!(" [{}]", id.get(..8).unwrap_or(id)));
        }

        let mut fields: Vec<String> = entry
            .fields
            .iter()
            .filter(|(key, _)| key.as_str() != "session_id")
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        if !fields.is_empty() {
            fields.sort();
            line.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        match &entry.location {
            Some(location) if self.include_location => {
                line.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
            _ => {}
        }

        line
    }
}

/// Accumulates fields for one entry; nothing is written until [`log`](Self::log).
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Values that fail to serialize are dropped.
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Address, round trip and whether an echo reply came back
    pub fn probe(self, result: &ProbeResult) -> Self {
        self.field("address", result.resolved_address().to_string())
            .field("rtt_ms", result.round_trip_ms())
            .field("success", result.succeeded())
    }

    pub fn probe_error(self, error: &ProbeError) -> Self {
        let builder = self
            .field("probe_error", error.kind())
            .field("packet_sent", error.packet_sent());
        match error.address() {
            Some(address) => builder.field("address", address.to_string()),
            None => builder,
        }
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal())
            .field("error_exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Builds loggers that share one session id
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }
}

/// Debug entry tagged with the call site
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn plain_logger(format: LogFormat) -> Logger {
        let config = Config {
            enable_color: false,
            log_format: format,
            ..Default::default()
        };
        Logger::with_config("TEST".to_string(), &config)
    }

    fn sample(level: LogLevel, correlation_id: Option<&str>) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level,
            message: "Test message".to_string(),
            logger: "TEST".to_string(),
            correlation_id: correlation_id.map(String::from),
            fields: HashMap::from([("key".to_string(), serde_json::json!("value"))]),
            location: None,
        }
    }

    #[test]
    fn test_level_order() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_threshold_follows_debug_flag() {
        let quiet = plain_logger(LogFormat::Console);
        assert_eq!(quiet.min_level, LogLevel::Info);
        assert!(!quiet.include_location);

        let config = Config {
            debug: true,
            log_format: LogFormat::Json,
            ..Default::default()
        };
        let loud = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(loud.min_level, LogLevel::Debug);
        assert!(loud.include_location);
        assert_eq!(loud.format, LogFormat::Json);
    }

    #[test]
    fn test_console_line() {
        let line = plain_logger(LogFormat::Console).render(&sample(LogLevel::Info, Some("0123456789abcdef")));
        assert!(line.contains(" INFO [TEST] Test message [01234567]"));
        assert!(line.ends_with("{key=\"value\"}"));
    }

    #[test]
    fn test_json_line() {
        let line = plain_logger(LogFormat::Json).render(&sample(LogLevel::Warn, None));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["message"], "Test message");
        assert_eq!(parsed["level"], "Warn");
        assert_eq!(parsed["fields"]["key"], "value");
    }

    #[test]
    fn test_compact_line() {
        let line = plain_logger(LogFormat::Compact).render(&sample(LogLevel::Error, None));
        assert!(line.ends_with("E TEST: Test message"));
    }

    #[test]
    fn test_short_correlation_id_is_kept_whole() {
        let line = plain_logger(LogFormat::Console).render(&sample(LogLevel::Warn, Some("abc")));
        assert!(line.contains("[abc]"));
    }

    #[test]
    fn test_location_only_shown_in_debug() {
        let mut entry = sample(LogLevel::Info, None);
        entry.location = Some(LogLocation {
            file: "src/driver.rs".to_string(),
            line: 42,
            module: None,
        });
        assert!(!plain_logger(LogFormat::Console).render(&entry).contains("@ src/driver.rs:42"));

        let config = Config { debug: true, enable_color: false, ..Default::default() };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert!(logger.render(&entry).ends_with("@ src/driver.rs:42"));
    }

    #[tokio::test]
    async fn test_cycle_correlation() {
        let logger = plain_logger(LogFormat::Console);
        let cycle_id = logger.start_cycle(1, 2).await;
        assert!(Uuid::parse_str(&cycle_id).is_ok());
        assert_eq!(logger.context.read().await.cycle_id.as_deref(), Some(cycle_id.as_str()));

        // a stale id does not close the current cycle
        logger.end_cycle("not-this-one").await;
        assert!(logger.context.read().await.cycle_id.is_some());

        logger.end_cycle(&cycle_id).await;
        assert!(logger.context.read().await.cycle_id.is_none());
    }

    #[tokio::test]
    async fn test_probe_fields() {
        let logger = plain_logger(LogFormat::Console);
        let result = ProbeResult::success(Ipv4Addr::LOCALHOST, Duration::from_millis(2));
        let builder = logger.info("reply").probe(&result);
        assert_eq!(builder.entry.fields["address"], "127.0.0.1");
        assert_eq!(builder.entry.fields["success"], true);

        let error = ProbeError::Timeout {
            address: Ipv4Addr::LOCALHOST,
            timeout: Duration::from_secs(5),
        };
        let builder = logger.warn("no reply").probe_error(&error);
        assert_eq!(builder.entry.fields["probe_error"], "timeout");
        assert_eq!(builder.entry.fields["packet_sent"], true);
        builder.log().await;
    }

    #[tokio::test]
    async fn test_factory_loggers_share_session() {
        let factory = LoggerFactory::new(Config::default());
        let first = factory.create_logger("driver").await;
        let second = factory.create_logger("pinger").await;
        assert_eq!(first.context.read().await.session_id.as_deref(), Some(factory.session_id.as_str()));
        assert_eq!(second.context.read().await.session_id, first.context.read().await.session_id);
    }

    #[test]
    fn test_log_format_serde() {
        assert_eq!(serde_json::to_string(&LogFormat::Compact).unwrap(), "\"compact\"");
        let parsed: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(parsed, LogFormat::Json);
    }
}
