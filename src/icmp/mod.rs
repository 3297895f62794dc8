//! ICMPv4 echo codec and socket plumbing

pub mod packet;
pub mod socket;

pub use packet::{EchoRequest, IcmpType, PacketError, parse_message};
pub use socket::{IcmpSocket, SocketFactory, SocketImpl, SystemSocketFactory};

/// Receive buffer size; one Ethernet MTU.
pub const RECV_BUFFER_SIZE: usize = 1500;

/// Shortest read timeout a socket can represent.
pub const MIN_READ_TIMEOUT: std::time::Duration = std::time::Duration::from_micros(1);
