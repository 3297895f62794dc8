use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;
use thiserror::Error;

/// A failure of a single echo exchange.
///
/// None of these stop the driver; the target is skipped for the current
/// cycle and probed again on the next one.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The ICMP socket could not be created or bound (usually missing privilege).
    #[error("failed to open ICMP socket on {listen_addr}: {source}")]
    Socket {
        listen_addr: Ipv4Addr,
        #[source]
        source: io::Error,
    },
    /// The target is not an IPv4 address and does not resolve to one.
    #[error("failed to resolve target '{target}': {reason}")]
    Resolution { target: String, reason: String },
    /// The echo request could not be encoded.
    #[error("failed to encode echo request: {0}")]
    Encoding(String),
    /// The echo request could not be written in full.
    #[error("failed to send echo request to {address}: {reason}")]
    Transmit { address: Ipv4Addr, reason: String },
    /// No packet arrived before the read deadline.
    #[error("no reply from {address} within {timeout:?}")]
    Timeout { address: Ipv4Addr, timeout: Duration },
    /// Reading from the socket failed for a reason other than the deadline.
    #[error("failed to read reply from {address}: {source}")]
    Receive {
        address: Ipv4Addr,
        #[source]
        source: io::Error,
    },
    /// The inbound packet is not a well-formed ICMPv4 message.
    #[error("malformed reply from {address}: {reason}")]
    Parse { address: Ipv4Addr, reason: String },
}

impl ProbeError {
    /// The resolved destination, for errors raised after resolution.
    pub fn address(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Transmit { address, .. }
            | Self::Timeout { address, .. }
            | Self::Receive { address, .. }
            | Self::Parse { address, .. } => Some(*address),
            Self::Socket { .. } | Self::Resolution { .. } | Self::Encoding(_) => None,
        }
    }

    /// Short machine-friendly name used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Socket { .. } => "socket",
            Self::Resolution { .. } => "resolution",
            Self::Encoding(_) => "encoding",
            Self::Transmit { .. } => "transmit",
            Self::Timeout { .. } => "timeout",
            Self::Receive { .. } => "receive",
            Self::Parse { .. } => "parse",
        }
    }

    /// Whether an echo request left the host before the failure.
    pub fn packet_sent(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Receive { .. } | Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_known_after_resolution() {
        let addr = Ipv4Addr::new(192, 0, 2, 1);
        let err = ProbeError::Timeout { address: addr, timeout: Duration::from_secs(5) };
        assert_eq!(err.address(), Some(addr));
        assert_eq!(err.kind(), "timeout");
        assert!(err.packet_sent());
    }

    #[test]
    fn test_address_unknown_before_resolution() {
        let err = ProbeError::Resolution {
            target: "999.1.1.1".to_string(),
            reason: "invalid address".to_string(),
        };
        assert_eq!(err.address(), None);
        assert!(!err.packet_sent());
        assert!(err.to_string().contains("999.1.1.1"));
    }

    #[test]
    fn test_socket_error_keeps_source() {
        use std::error::Error as _;
        let err = ProbeError::Socket {
            listen_addr: Ipv4Addr::UNSPECIFIED,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("0.0.0.0"));
    }
}
