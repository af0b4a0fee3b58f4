use crate::error::Error::InvalidSourceAddr;
use crate::error::Result;
use crate::net::platform::Platform;
use crate::net::socket::Socket;
use crate::types::Port;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// The port used for local address discovery.
const DISCOVERY_PORT: Port = Port(80);

/// Discover or validate a source address.
pub struct SourceAddr;

impl SourceAddr {
    /// Discover the source `Ipv4Addr`.
    pub fn discover<P: Platform>(target_addr: Ipv4Addr) -> Result<Ipv4Addr> {
        P::discover_local_addr(target_addr, DISCOVERY_PORT.0)
    }

    /// Validate that we can bind to the source `Ipv4Addr`.
    pub fn validate<S: Socket>(source_addr: Ipv4Addr) -> Result<Ipv4Addr> {
        let mut socket = S::new_udp_dgram_socket_ipv4()?;
        let sock_addr = SocketAddr::new(IpAddr::V4(source_addr), 0);
        match socket.bind(sock_addr) {
            Ok(()) => Ok(source_addr),
            Err(_) => Err(InvalidSourceAddr(sock_addr.ip())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoError;
    use crate::net::platform::MockPlatform;
    use crate::net::socket::MockSocket;
    use mockall::predicate;
    use std::str::FromStr;
    use std::sync::Mutex;

    static MTX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_discover_local_addr() {
        let _m = MTX.lock();

        let expected_target = Ipv4Addr::from_str("1.2.3.4").unwrap();
        let expected_port = DISCOVERY_PORT.0;
        let expected_src = Ipv4Addr::from_str("192.168.0.1").unwrap();

        let ctx = MockPlatform::discover_local_addr_context();
        ctx.expect()
            .with(predicate::eq(expected_target), predicate::eq(expected_port))
            .times(1)
            .returning(move |_, _| Ok(expected_src));

        let src_addr = SourceAddr::discover::<MockPlatform>(expected_target).unwrap();
        assert_eq!(expected_src, src_addr);
    }

    #[test]
    fn test_validate() {
        let _m = MTX.lock();

        let addr = Ipv4Addr::from_str("192.168.0.1").unwrap();
        let expected_bind_addr = SocketAddr::new(IpAddr::V4(addr), 0);

        let ctx = MockSocket::new_udp_dgram_socket_ipv4_context();
        ctx.expect().times(1).returning(move || {
            let mut mocket = MockSocket::new();
            mocket
                .expect_bind()
                .with(predicate::eq(expected_bind_addr))
                .times(1)
                .returning(|_| Ok(()));
            Ok(mocket)
        });

        let src_addr = SourceAddr::validate::<MockSocket>(addr).unwrap();
        assert_eq!(addr, src_addr);
    }

    #[test]
    fn test_validate_invalid() {
        let _m = MTX.lock();

        let addr = Ipv4Addr::from_str("1.2.3.4").unwrap();
        let expected_bind_addr = SocketAddr::new(IpAddr::V4(addr), 0);

        let ctx = MockSocket::new_udp_dgram_socket_ipv4_context();
        ctx.expect().times(1).returning(move || {
            let mut mocket = MockSocket::new();
            mocket
                .expect_bind()
                .with(predicate::eq(expected_bind_addr))
                .times(1)
                .returning(|addr| Err(IoError::Bind(std::io::Error::last_os_error(), addr)));
            Ok(mocket)
        });

        let err = SourceAddr::validate::<MockSocket>(addr).unwrap_err();
        assert!(matches!(err, InvalidSourceAddr(_)));
    }
}
