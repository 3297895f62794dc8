//! Data models and structures for the latency reporter

pub mod config;
pub mod probe;

// Re-export main model types
pub use config::Config;
pub use probe::{PingReport, ProbeResult};
