//! ICMP Latency Reporter
//!
//! Periodically sends a single ICMPv4 echo request to each configured host,
//! measures the round-trip time and posts every sample as JSON to an HTTP
//! collector.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod icmp;
pub mod logging;
pub mod models;
pub mod prober;
pub mod publisher;

// Re-export commonly used types
pub use driver::{CollectorDriver, CycleSummary};
pub use error::{AppError, ProbeError, Result};
pub use models::{Config, PingReport, ProbeResult};
pub use prober::{IcmpProber, Prober};
pub use publisher::{HttpPublisher, Publisher};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");
pub const TARGET_TRIPLE: Option<&str> = option_env!("TARGET_TRIPLE");

/// Default configuration values
pub mod defaults {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    pub const DEFAULT_API_HOST: &str = "localhost";
    pub const DEFAULT_API_PORT: &str = "8080";
    pub const DEFAULT_LISTEN_ADDR: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_PROBE_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_PRIVILEGED: bool = true;
    pub const DEFAULT_PUBLISH_FAILURES: bool = false;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DEFAULT_ENV_FILE: &str = ".env";
    /// Path on the collector that accepts ping samples.
    pub const COLLECTOR_PATH: &str = "/pings";
}
