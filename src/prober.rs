//! Single ICMPv4 echo exchange against one target
//!
//! A probe resolves the target, opens a fresh socket, sends exactly one Echo
//! Request and waits for one answer until the read deadline. The socket is
//! dropped on every return path.
//!
//! Replies are matched by ICMP type only; identifier and sequence are not
//! cross-checked. That is sound only while at most one probe is outstanding,
//! which the sequential driver guarantees. Parallel probing would need to
//! match on identifier and sequence as well.

use crate::error::ProbeError;
use crate::icmp::{
    parse_message, socket::is_timeout, EchoRequest, IcmpSocket, IcmpType, SocketFactory,
    SystemSocketFactory, MIN_READ_TIMEOUT, RECV_BUFFER_SIZE,
};
use crate::models::{Config, ProbeResult};
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Result of a single probe.
pub type ProbeOutcome = std::result::Result<ProbeResult, ProbeError>;

/// Performs one echo exchange.
///
/// Implementations block; async callers run them on the blocking pool.
pub trait Prober: Send + Sync {
    fn probe(&self, target: &str, listen_addr: Ipv4Addr) -> ProbeOutcome;
}

/// Turns a target string into the IPv4 address to probe.
pub trait TargetResolver: Send + Sync {
    fn resolve(&self, target: &str) -> Result<Ipv4Addr, ProbeError>;
}

/// Resolves IPv4 literals directly and host names through the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl TargetResolver for SystemResolver {
    fn resolve(&self, target: &str) -> Result<Ipv4Addr, ProbeError> {
        let resolution_error = |reason: &str| ProbeError::Resolution {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(resolution_error("empty target"));
        }
        match trimmed.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => return Ok(addr),
            Ok(IpAddr::V6(_)) => return Err(resolution_error("IPv6 targets are not supported")),
            Err(_) => {}
        }
        // Dotted digits that did not parse are a malformed literal, not a host name.
        if trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(resolution_error("invalid IPv4 address"));
        }

        let addrs = (trimmed, 0)
            .to_socket_addrs()
            .map_err(|e| resolution_error(&e.to_string()))?;
        addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| resolution_error("no IPv4 address found"))
    }
}

/// ICMPv4 echo prober.
pub struct IcmpProber<F, R = SystemResolver> {
    factory: F,
    resolver: R,
    timeout: Duration,
    request: EchoRequest,
}

impl IcmpProber<SystemSocketFactory> {
    /// Prober using real sockets, as configured.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SystemSocketFactory::new(config.privileged),
            SystemResolver,
            config.probe_timeout(),
        )
    }
}

impl<F, R> IcmpProber<F, R>
where
    F: SocketFactory,
    R: TargetResolver,
{
    pub fn new(factory: F, resolver: R, timeout: Duration) -> Self {
        Self {
            factory,
            resolver,
            timeout,
            request: EchoRequest::for_current_process(),
        }
    }

    /// Override the echo request sent by every probe.
    pub fn with_request(mut self, request: EchoRequest) -> Self {
        self.request = request;
        self
    }

    fn receive(
        &self,
        socket: &mut F::Socket,
        address: Ipv4Addr,
        start: Instant,
    ) -> ProbeOutcome {
        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            let Some(remaining) = read_budget(deadline, Instant::now()) else {
                return Err(ProbeError::Timeout { address, timeout: self.timeout });
            };
            socket
                .set_read_timeout(remaining)
                .map_err(|source| ProbeError::Receive { address, source })?;
            let bytes_read = match socket.recv(&mut buf) {
                Ok(n) => n,
                Err(err) if is_timeout(&err) => {
                    return Err(ProbeError::Timeout { address, timeout: self.timeout });
                }
                Err(source) => return Err(ProbeError::Receive { address, source }),
            };
            let round_trip = start.elapsed();
            let icmp_type = parse_message(&buf[..bytes_read]).map_err(|e| ProbeError::Parse {
                address,
                reason: e.to_string(),
            })?;
            match icmp_type {
                IcmpType::EchoReply => return Ok(ProbeResult::success(address, round_trip)),
                // our own request, looped back to a raw listener
                IcmpType::EchoRequest => continue,
                _ => return Ok(ProbeResult::failed(address)),
            }
        }
    }
}

/// Time left for the next read, or `None` once the deadline is spent.
///
/// Socket read timeouts have microsecond resolution and a zero timeout
/// blocks forever, so anything under one microsecond counts as spent.
fn read_budget(deadline: Instant, now: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(now);
    (remaining >= MIN_READ_TIMEOUT).then_some(remaining)
}

impl<F, R> Prober for IcmpProber<F, R>
where
    F: SocketFactory,
    R: TargetResolver,
{
    fn probe(&self, target: &str, listen_addr: Ipv4Addr) -> ProbeOutcome {
        let address = self.resolver.resolve(target)?;
        let packet = self
            .request
            .encode()
            .map_err(|e| ProbeError::Encoding(e.to_string()))?;
        let mut socket = self
            .factory
            .open(listen_addr)
            .map_err(|source| ProbeError::Socket { listen_addr, source })?;

        let start = Instant::now();
        let written = socket
            .send_to(&packet, address)
            .map_err(|e| ProbeError::Transmit { address, reason: e.to_string() })?;
        if written != packet.len() {
            return Err(ProbeError::Transmit {
                address,
                reason: format!("short write: {} of {} bytes", written, packet.len()),
            });
        }

        self.receive(&mut socket, address, start)
    }
}
