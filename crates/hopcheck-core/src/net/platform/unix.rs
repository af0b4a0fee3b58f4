use crate::error::Result;
use crate::net::platform::{Ipv4ByteOrder, Platform};
use std::net::Ipv4Addr;

pub struct PlatformImpl;

impl Platform for PlatformImpl {
    fn byte_order_for_address(addr: Ipv4Addr) -> Result<Ipv4ByteOrder> {
        address::for_address(addr)
    }
    fn discover_local_addr(target_addr: Ipv4Addr, port: u16) -> Result<Ipv4Addr> {
        address::discover_local_addr(target_addr, port)
    }
}

mod address {
    use crate::error::{Error, Result};
    use crate::net::platform::Ipv4ByteOrder;
    use crate::net::socket::Socket;
    use crate::net::SocketImpl;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tracing::instrument;

    /// The size of the test packet to use for discovering the `total_length` byte order.
    #[cfg(not(target_os = "linux"))]
    const TEST_PACKET_LENGTH: u16 = 256;

    /// Discover the required byte ordering for the IPv4 header fields `total_length`, `flags` and
    /// `fragment_offset`.
    ///
    /// Linux accepts either network byte order or host byte order for the `total_length` field, and
    /// so we skip the check and return network byte order unconditionally.
    #[cfg(target_os = "linux")]
    #[expect(clippy::unnecessary_wraps)]
    pub const fn for_address(_src_addr: Ipv4Addr) -> Result<Ipv4ByteOrder> {
        Ok(Ipv4ByteOrder::Network)
    }

    #[cfg(not(target_os = "linux"))]
    #[instrument(ret, level = "trace")]
    pub fn for_address(addr: Ipv4Addr) -> Result<Ipv4ByteOrder> {
        match test_send_local_ip4_packet(addr, TEST_PACKET_LENGTH) {
            Ok(()) => Ok(Ipv4ByteOrder::Network),
            Err(Error::IoError(io))
                if io.kind() == crate::error::ErrorKind::Std(std::io::ErrorKind::InvalidInput) =>
            {
                match test_send_local_ip4_packet(addr, TEST_PACKET_LENGTH.swap_bytes()) {
                    Ok(()) => Ok(Ipv4ByteOrder::Host),
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Attempt to send an `ICMP` packet to a local address.
    ///
    /// The packet is actually of length `256` bytes, but we set the `total_length` based on the
    /// input provided to test if the OS rejects the attempt during the call to `send_to`.
    ///
    /// Note that this implementation will try to create an `IPPROTO_ICMP` socket and if that fails
    /// it will fall back to creating an `IPPROTO_RAW` socket.
    #[cfg(not(target_os = "linux"))]
    #[instrument(ret, level = "trace")]
    fn test_send_local_ip4_packet(src_addr: Ipv4Addr, total_length: u16) -> Result<()> {
        use socket2::Protocol;
        let mut icmp_buf = [0_u8; hopcheck_packet::icmpv4::IcmpPacket::minimum_packet_size()];
        let mut icmp =
            hopcheck_packet::icmpv4::echo_request::EchoRequestPacket::new(&mut icmp_buf)?;
        icmp.set_icmp_type(hopcheck_packet::icmpv4::IcmpType::EchoRequest);
        icmp.set_icmp_code(hopcheck_packet::icmpv4::IcmpCode(0));
        icmp.set_identifier(0);
        icmp.set_sequence(0);
        icmp.set_checksum(hopcheck_packet::checksum::icmp_ipv4_checksum(icmp.packet()));
        let mut ipv4_buf = [0_u8; TEST_PACKET_LENGTH as usize];
        let mut ipv4 = hopcheck_packet::ipv4::Ipv4Packet::new(&mut ipv4_buf)?;
        ipv4.set_version(4);
        ipv4.set_header_length(5);
        ipv4.set_protocol(hopcheck_packet::IpProtocol::Icmp);
        ipv4.set_ttl(255);
        ipv4.set_source(src_addr);
        ipv4.set_destination(Ipv4Addr::LOCALHOST);
        ipv4.set_total_length(total_length);
        ipv4.set_payload(icmp.packet());
        let mut probe_socket = SocketImpl::new_dgram_ipv4(Protocol::ICMPV4)
            .or_else(|_| SocketImpl::new_raw_ipv4(Protocol::from(nix::libc::IPPROTO_RAW)))?;
        probe_socket.set_header_included(true)?;
        let remote_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        probe_socket.send_to(ipv4.packet(), remote_addr)?;
        Ok(())
    }

    // Note that no packets are transmitted by this method.
    #[instrument(ret, level = "trace")]
    pub fn discover_local_addr(target_addr: Ipv4Addr, port: u16) -> Result<Ipv4Addr> {
        let mut socket = SocketImpl::new_udp_dgram_socket_ipv4()?;
        socket.connect(SocketAddr::new(IpAddr::V4(target_addr), port))?;
        match socket.local_addr()?.ok_or(Error::MissingAddr)?.ip() {
            IpAddr::V4(addr) => Ok(addr),
            IpAddr::V6(addr) => Err(Error::InvalidSourceAddr(IpAddr::V6(addr))),
        }
    }
}

mod socket {
    use crate::error::{ErrorKind, IoError, IoOperation, IoResult};
    use crate::net::socket::{Socket, SocketError};
    use itertools::Itertools;
    use nix::{
        sys::select::FdSet,
        sys::time::{TimeVal, TimeValLike},
        Error,
    };
    use socket2::{Domain, Protocol, SockAddr, Type};
    use std::io;
    use std::io::Read;
    use std::net::Ipv4Addr;
    use std::net::{Shutdown, SocketAddr};
    use std::os::fd::AsFd;
    use std::time::Duration;
    use tracing::instrument;

    /// A network socket.
    pub struct SocketImpl {
        inner: socket2::Socket,
    }

    impl SocketImpl {
        fn new(domain: Domain, ty: Type, protocol: Protocol) -> IoResult<Self> {
            Ok(Self {
                inner: socket2::Socket::new(domain, ty, Some(protocol))
                    .map_err(|err| IoError::Other(err, IoOperation::NewSocket))?,
            })
        }

        pub(super) fn new_raw_ipv4(protocol: Protocol) -> IoResult<Self> {
            Self::new(Domain::IPV4, Type::RAW, protocol)
        }

        pub(super) fn new_dgram_ipv4(protocol: Protocol) -> IoResult<Self> {
            Self::new(Domain::IPV4, Type::DGRAM, protocol)
        }

        fn set_nonblocking(&self, nonblocking: bool) -> IoResult<()> {
            self.inner
                .set_nonblocking(nonblocking)
                .map_err(|err| IoError::Other(err, IoOperation::SetNonBlocking))
        }

        pub(super) fn set_header_included(&mut self, included: bool) -> IoResult<()> {
            self.inner
                .set_header_included_v4(included)
                .map_err(|err| IoError::Other(err, IoOperation::SetHeaderIncluded))
        }

        pub(super) fn local_addr(&self) -> IoResult<Option<SocketAddr>> {
            Ok(self
                .inner
                .local_addr()
                .map_err(|err| IoError::Other(err, IoOperation::LocalAddr))?
                .as_socket())
        }
    }

    impl Socket for SocketImpl {
        #[instrument(level = "trace")]
        fn new_icmp_send_socket_ipv4() -> IoResult<Self> {
            let mut socket = Self::new_raw_ipv4(Protocol::from(nix::libc::IPPROTO_RAW))?;
            socket.set_nonblocking(true)?;
            socket.set_header_included(true)?;
            Ok(socket)
        }
        #[instrument(level = "trace")]
        fn new_recv_socket_ipv4(_: Ipv4Addr) -> IoResult<Self> {
            let mut socket = Self::new_raw_ipv4(Protocol::ICMPV4)?;
            socket.set_nonblocking(true)?;
            socket.set_header_included(true)?;
            Ok(socket)
        }
        #[instrument(level = "trace")]
        fn new_stream_socket_ipv4() -> IoResult<Self> {
            let socket = Self::new(Domain::IPV4, Type::STREAM, Protocol::TCP)?;
            socket.set_nonblocking(true)?;
            Ok(socket)
        }
        #[instrument(level = "trace")]
        fn new_udp_dgram_socket_ipv4() -> IoResult<Self> {
            Self::new_dgram_ipv4(Protocol::UDP)
        }
        #[instrument(skip(self), level = "trace")]
        fn bind(&mut self, address: SocketAddr) -> IoResult<()> {
            self.inner
                .bind(&SockAddr::from(address))
                .map_err(|err| IoError::Bind(err, address))
        }
        #[instrument(skip(self), level = "trace")]
        fn connect(&mut self, address: SocketAddr) -> IoResult<()> {
            tracing::trace!(?address);
            self.inner
                .connect(&SockAddr::from(address))
                .map_err(|err| IoError::Connect(err, address))
        }
        #[instrument(skip(self, buf), level = "trace")]
        fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> IoResult<()> {
            tracing::trace!(buf = format!("{:02x?}", buf.iter().format(" ")), ?addr);
            self.inner
                .send_to(buf, &SockAddr::from(addr))
                .map_err(|err| IoError::SendTo(err, addr))?;
            Ok(())
        }
        #[instrument(skip(self), level = "trace")]
        fn is_readable(&mut self, timeout: Duration) -> IoResult<bool> {
            let mut read = FdSet::new();
            read.insert(self.inner.as_fd());
            let readable = nix::sys::select::select(
                None,
                Some(&mut read),
                None,
                None,
                Some(&mut TimeVal::milliseconds(timeout.as_millis() as i64)),
            );
            match readable {
                Ok(readable) => Ok(readable == 1),
                Err(Error::EINTR) => Ok(false),
                Err(err) => Err(IoError::Other(
                    std::io::Error::from(err),
                    IoOperation::Select,
                )),
            }
        }
        #[instrument(skip(self), level = "trace")]
        fn is_writable(&mut self) -> IoResult<bool> {
            let mut write = FdSet::new();
            write.insert(self.inner.as_fd());
            let writable = nix::sys::select::select(
                None,
                None,
                Some(&mut write),
                None,
                Some(&mut TimeVal::zero()),
            );
            match writable {
                Ok(writable) => Ok(writable == 1),
                Err(Error::EINTR) => Ok(false),
                Err(err) => Err(IoError::Other(
                    std::io::Error::from(err),
                    IoOperation::Select,
                )),
            }
        }
        #[instrument(skip(self, buf), level = "trace")]
        fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
            let bytes_read = self
                .inner
                .read(buf)
                .map_err(|err| IoError::Other(err, IoOperation::Read))?;
            tracing::trace!(
                buf = format!("{:02x?}", buf[..bytes_read].iter().format(" ")),
                bytes_read
            );
            Ok(bytes_read)
        }
        #[instrument(skip(self), level = "trace")]
        fn shutdown(&mut self) -> IoResult<()> {
            self.inner
                .shutdown(Shutdown::Both)
                .map_err(|err| IoError::Other(err, IoOperation::Shutdown))
        }
        #[instrument(skip(self), ret, level = "trace")]
        fn take_error(&mut self) -> IoResult<Option<SocketError>> {
            self.inner
                .take_error()
                .map(|err| {
                    err.map(|e| match e.raw_os_error() {
                        Some(errno) if Error::from_raw(errno) == Error::ECONNREFUSED => {
                            SocketError::ConnectionRefused
                        }
                        Some(errno) if Error::from_raw(errno) == Error::EHOSTUNREACH => {
                            SocketError::HostUnreachable
                        }
                        _ => SocketError::Other(e),
                    })
                })
                .map_err(|err| IoError::Other(err, IoOperation::TakeError))
        }
    }

    impl From<&io::Error> for ErrorKind {
        fn from(value: &io::Error) -> Self {
            if value.raw_os_error() == io::Error::from(Error::EINPROGRESS).raw_os_error() {
                Self::InProgress
            } else if value.raw_os_error() == io::Error::from(Error::EHOSTUNREACH).raw_os_error() {
                Self::HostUnreachable
            } else if value.raw_os_error() == io::Error::from(Error::ENETUNREACH).raw_os_error() {
                Self::NetUnreachable
            } else {
                Self::Std(value.kind())
            }
        }
    }

    // only used for unit tests
    impl From<ErrorKind> for io::Error {
        fn from(value: ErrorKind) -> Self {
            match value {
                ErrorKind::InProgress => Self::from(Error::EINPROGRESS),
                ErrorKind::HostUnreachable => Self::from(Error::EHOSTUNREACH),
                ErrorKind::NetUnreachable => Self::from(Error::ENETUNREACH),
                ErrorKind::Std(kind) => Self::from(kind),
            }
        }
    }
}

pub use socket::SocketImpl;
