//! ICMPv4 echo wire format, built on `trippy-packet`.
//!
//! Only the pieces needed for a single echo exchange are exposed: encoding
//! an Echo Request and reading the type of whatever comes back.

use thiserror::Error;
use trippy_packet::checksum::icmp_ipv4_checksum;
use trippy_packet::icmpv4::echo_request::EchoRequestPacket;
use trippy_packet::icmpv4::{IcmpCode, IcmpPacket};
use trippy_packet::ipv4::Ipv4Packet;

pub use trippy_packet::icmpv4::IcmpType;

/// Largest echo payload that still fits a single IPv4 datagram.
pub const MAX_ECHO_PAYLOAD: usize = 65_507 - IcmpPacket::minimum_packet_size();

/// A packet error result.
pub type Result<T> = std::result::Result<T, PacketError>;

/// A packet encode/decode error.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum PacketError {
    #[error(transparent)]
    Packet(#[from] trippy_packet::error::Error),
    /// The echo payload does not fit in one datagram.
    #[error("echo payload of {0} bytes exceeds the maximum of {MAX_ECHO_PAYLOAD}")]
    PayloadTooLarge(usize),
    /// The leading IPv4 header declares an impossible length.
    #[error("invalid IPv4 header length {0}")]
    InvalidIpv4HeaderLength(usize),
}

/// An ICMPv4 Echo Request ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoRequest {
    /// Every probe sends sequence 1; calls are independent of each other.
    pub const SEQUENCE: u16 = 1;

    #[must_use]
    pub fn new(identifier: u16, sequence: u16) -> Self {
        Self {
            identifier,
            sequence,
            payload: Vec::new(),
        }
    }

    /// The request this process sends: pid-derived identifier, sequence 1,
    /// empty payload.
    #[must_use]
    pub fn for_current_process() -> Self {
        Self::new(process_identifier(), Self::SEQUENCE)
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Serialize to wire bytes with a valid checksum.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > MAX_ECHO_PAYLOAD {
            return Err(PacketError::PayloadTooLarge(self.payload.len()));
        }
        let mut buf = vec![0; IcmpPacket::minimum_packet_size() + self.payload.len()];
        let mut icmp = EchoRequestPacket::new(&mut buf)?;
        icmp.set_icmp_type(IcmpType::EchoRequest);
        icmp.set_icmp_code(IcmpCode(0));
        icmp.set_identifier(self.identifier);
        icmp.set_sequence(self.sequence);
        icmp.set_payload(&self.payload);
        icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
        Ok(buf)
    }
}

/// Truncate a process id to the 16 bit echo identifier.
#[must_use]
pub fn truncate_identifier(pid: u32) -> u16 {
    (pid & 0xffff) as u16
}

/// The echo identifier of the running process.
#[must_use]
pub fn process_identifier() -> u16 {
    truncate_identifier(std::process::id())
}

/// Read the ICMP type of an inbound message.
///
/// Raw sockets deliver the IPv4 header in front of the ICMP message while
/// datagram ICMP sockets do not, so a leading IPv4 header is skipped when
/// present. No assigned ICMP type has 4 in its upper nibble.
pub fn parse_message(buf: &[u8]) -> Result<IcmpType> {
    let icmp = IcmpPacket::new_view(strip_ipv4_header(buf)?)?;
    Ok(icmp.get_icmp_type())
}

fn strip_ipv4_header(buf: &[u8]) -> Result<&[u8]> {
    match buf.first() {
        Some(first) if first >> 4 == 4 => {
            let ipv4 = Ipv4Packet::new_view(buf)?;
            let header_len = usize::from(ipv4.get_header_length()) * 4;
            if header_len < Ipv4Packet::minimum_packet_size() {
                return Err(PacketError::InvalidIpv4HeaderLength(header_len));
            }
            if buf.len() < header_len {
                return Err(trippy_packet::error::Error::InsufficientPacketBuffer(
                    String::from("Ipv4Packet"),
                    header_len,
                    buf.len(),
                )
                .into());
            }
            Ok(&buf[header_len..])
        }
        _ => Ok(buf),
    }
}
