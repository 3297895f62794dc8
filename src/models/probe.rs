//! Probe result and collector wire record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Outcome of a single echo exchange with one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    resolved_address: Ipv4Addr,
    round_trip: Duration,
    observed_at: DateTime<Utc>,
    succeeded: bool,
}

impl ProbeResult {
    /// An Echo Reply arrived after `round_trip`.
    pub fn success(resolved_address: Ipv4Addr, round_trip: Duration) -> Self {
        Self {
            resolved_address,
            round_trip,
            observed_at: Utc::now(),
            succeeded: true,
        }
    }

    /// The target answered with something other than an Echo Reply, or did
    /// not answer at all. Latency is reported as zero.
    pub fn failed(resolved_address: Ipv4Addr) -> Self {
        Self {
            resolved_address,
            round_trip: Duration::ZERO,
            observed_at: Utc::now(),
            succeeded: false,
        }
    }

    pub fn resolved_address(&self) -> Ipv4Addr {
        self.resolved_address
    }

    pub fn round_trip(&self) -> Duration {
        self.round_trip
    }

    pub fn round_trip_seconds(&self) -> f64 {
        self.round_trip.as_secs_f64()
    }

    pub fn round_trip_ms(&self) -> f64 {
        self.round_trip.as_secs_f64() * 1000.0
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }
}

/// JSON body posted to the collector's `/pings` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingReport {
    /// Address that was probed.
    pub ip_address: String,
    /// Round-trip time in seconds.
    pub ping_time: f64,
    /// When the sample was taken.
    pub last_seen: DateTime<Utc>,
}

impl PingReport {
    /// Build the wire record for a probe, stamped with when it was observed.
    pub fn from_result(result: &ProbeResult) -> Self {
        Self {
            ip_address: result.resolved_address().to_string(),
            ping_time: result.round_trip_seconds(),
            last_seen: result.observed_at(),
        }
    }
}

impl From<&ProbeResult> for PingReport {
    fn from(result: &ProbeResult) -> Self {
        Self::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = ProbeResult::success(Ipv4Addr::LOCALHOST, Duration::from_micros(250));
        assert!(result.succeeded());
        assert!(result.round_trip_seconds() > 0.0);
        assert!((result.round_trip_ms() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_failed_result_has_zero_latency() {
        let result = ProbeResult::failed(Ipv4Addr::new(10, 1, 1, 1));
        assert!(!result.succeeded());
        assert_eq!(result.round_trip(), Duration::ZERO);
        assert_eq!(result.round_trip_seconds(), 0.0);
    }

    #[test]
    fn test_report_last_seen_is_observation_time() {
        let result = ProbeResult::success(Ipv4Addr::LOCALHOST, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        let report = PingReport::from(&result);
        assert_eq!(report.last_seen, result.observed_at());
    }

    #[test]
    fn test_report_json_shape() {
        let before = Utc::now();
        let result = ProbeResult::success(Ipv4Addr::LOCALHOST, Duration::from_millis(3));
        let report = PingReport::from(&result);
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert_eq!(json["ip_address"], "127.0.0.1");
        assert!((json["ping_time"].as_f64().unwrap() - 0.003).abs() < 1e-9);

        let last_seen = json["last_seen"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(last_seen).unwrap();
        assert!(parsed >= before);
        assert!(parsed <= Utc::now());

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
    }
}
