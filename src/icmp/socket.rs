use socket2::{Domain, Protocol, SockAddr, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// A socket able to carry one ICMPv4 echo exchange.
pub trait IcmpSocket {
    /// Send `buf` to `addr`, returning the number of bytes written.
    fn send_to(&mut self, buf: &[u8], addr: Ipv4Addr) -> io::Result<usize>;
    /// Bound the next blocking read.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;
    /// Read one inbound packet.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens sockets for the prober.
///
/// A fresh socket is opened per probe and dropped when the probe returns.
pub trait SocketFactory: Send + Sync {
    type Socket: IcmpSocket;

    fn open(&self, listen_addr: Ipv4Addr) -> io::Result<Self::Socket>;
}

/// ICMPv4 socket backed by `socket2`.
#[derive(Debug)]
pub struct SocketImpl {
    inner: socket2::Socket,
}

impl SocketImpl {
    /// Raw ICMP socket; needs `CAP_NET_RAW` or root.
    pub fn new_raw_ipv4() -> io::Result<Self> {
        Ok(Self {
            inner: socket2::Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?,
        })
    }

    /// Unprivileged datagram ICMP socket.
    ///
    /// Linux only allows this for groups listed in `net.ipv4.ping_group_range`
    /// and rewrites the echo identifier to the socket's local port.
    pub fn new_dgram_ipv4() -> io::Result<Self> {
        Ok(Self {
            inner: socket2::Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4))?,
        })
    }

    pub fn bind(&mut self, addr: Ipv4Addr) -> io::Result<()> {
        self.inner
            .bind(&SockAddr::from(SocketAddr::V4(SocketAddrV4::new(addr, 0))))
    }
}

impl IcmpSocket for SocketImpl {
    fn send_to(&mut self, buf: &[u8], addr: Ipv4Addr) -> io::Result<usize> {
        self.inner
            .send_to(buf, &SockAddr::from(SocketAddr::V4(SocketAddrV4::new(addr, 0))))
    }

    /// A sub-microsecond timeout would truncate to zero, which the kernel
    /// treats as "no timeout", so it is raised to the minimum.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.inner.set_read_timeout(Some(timeout.max(super::MIN_READ_TIMEOUT)))
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Opens raw or datagram sockets depending on available privilege.
#[derive(Debug, Clone, Copy)]
pub struct SystemSocketFactory {
    privileged: bool,
}

impl SystemSocketFactory {
    pub fn new(privileged: bool) -> Self {
        Self { privileged }
    }
}

impl SocketFactory for SystemSocketFactory {
    type Socket = SocketImpl;

    fn open(&self, listen_addr: Ipv4Addr) -> io::Result<SocketImpl> {
        let mut socket = if self.privileged {
            SocketImpl::new_raw_ipv4()?
        } else {
            SocketImpl::new_dgram_ipv4()?
        };
        socket.bind(listen_addr)?;
        Ok(socket)
    }
}

/// Whether an I/O error means the read deadline passed.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(io::ErrorKind::ConnectionReset)));
    }

    #[test]
    #[ignore = "needs CAP_NET_RAW or root"]
    fn test_sub_microsecond_read_timeout_still_returns() {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let mut socket = SystemSocketFactory::new(true)
                .open(Ipv4Addr::UNSPECIFIED)
                .unwrap();
            socket.set_read_timeout(Duration::from_nanos(500)).unwrap();
            let mut buf = [0u8; crate::icmp::RECV_BUFFER_SIZE];
            let _ = tx.send(socket.recv(&mut buf).map(|_| ()));
        });

        // any outcome is fine as long as the read does not block forever
        assert!(rx.recv_timeout(Duration::from_secs(3)).is_ok());
    }
}
