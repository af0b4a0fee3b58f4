use crate::error::{Error, ErrorKind, Result};
use crate::net::channel::MAX_PACKET_SIZE;
use crate::net::common::ErrorMapper;
use crate::net::platform;
use crate::net::socket::Socket;
use crate::probe::{IcmpPacketCode, Probe, Response, ResponseData};
use crate::types::{PayloadSize, Sequence, TraceId};
use hopcheck_packet::checksum::icmp_ipv4_checksum;
use hopcheck_packet::icmpv4::destination_unreachable::DestinationUnreachablePacket;
use hopcheck_packet::icmpv4::echo_reply::EchoReplyPacket;
use hopcheck_packet::icmpv4::echo_request::EchoRequestPacket;
use hopcheck_packet::icmpv4::time_exceeded::TimeExceededPacket;
use hopcheck_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpTimeExceededCode, IcmpType};
use hopcheck_packet::ipv4::Ipv4Packet;
use hopcheck_packet::IpProtocol;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;
use tracing::instrument;

/// The maximum size of ICMP packet we allow.
const MAX_ICMP_PACKET_BUF: usize = MAX_PACKET_SIZE - Ipv4Packet::minimum_packet_size();

/// The maximum size of ICMP payload we allow.
const MAX_ICMP_PAYLOAD_BUF: usize = MAX_ICMP_PACKET_BUF - IcmpPacket::minimum_packet_size();

/// The value for the IPv4 `flags_and_fragment_offset` field to set the `Don't fragment` bit.
///
/// 0100 0000 0000 0000
const DONT_FRAGMENT: u16 = 0x4000;

/// IPv4 configuration.
#[derive(Debug)]
pub struct Ipv4 {
    pub src_addr: Ipv4Addr,
    pub dest_addr: Ipv4Addr,
    pub byte_order: platform::Ipv4ByteOrder,
    pub payload_size: PayloadSize,
}

impl Default for Ipv4 {
    fn default() -> Self {
        Self {
            src_addr: Ipv4Addr::UNSPECIFIED,
            dest_addr: Ipv4Addr::UNSPECIFIED,
            byte_order: platform::Ipv4ByteOrder::Network,
            payload_size: PayloadSize(0),
        }
    }
}

impl Ipv4 {
    /// Dispatch an ICMP probe.
    #[instrument(skip(self, icmp_send_socket), level = "trace")]
    pub fn dispatch_icmp_probe<S: Socket>(
        &self,
        icmp_send_socket: &mut S,
        probe: Probe,
    ) -> Result<()> {
        let mut ipv4_buf = [0_u8; MAX_PACKET_SIZE];
        let mut icmp_buf = [0_u8; MAX_ICMP_PACKET_BUF];
        let payload_size = usize::from(self.payload_size.0);
        if payload_size > MAX_ICMP_PAYLOAD_BUF {
            return Err(Error::InvalidPacketSize(
                Ipv4Packet::minimum_packet_size() + IcmpPacket::minimum_packet_size() + payload_size,
            ));
        }
        let echo_request = make_echo_request_icmp_packet(
            &mut icmp_buf,
            probe.identifier,
            probe.sequence,
            payload_size,
        )?;
        let ipv4 = self.make_ipv4_packet(&mut ipv4_buf, probe.ttl.0, echo_request.packet())?;
        let remote_addr = SocketAddr::new(IpAddr::V4(self.dest_addr), 0);
        icmp_send_socket
            .send_to(ipv4.packet(), remote_addr)
            .map_err(Error::IoError)
            .map_err(|err| ErrorMapper::probe_failed(err, ErrorKind::HostUnreachable))
            .map_err(|err| ErrorMapper::probe_failed(err, ErrorKind::NetUnreachable))
            .map_err(|err| ErrorMapper::probe_failed(err, INVALID_INPUT_KIND))?;
        Ok(())
    }

    /// Receive an ICMP probe response.
    ///
    /// The raw socket sees all inbound ICMP traffic for the host, so packets which cannot be
    /// parsed are discarded rather than treated as errors.
    #[instrument(skip(self, recv_socket), level = "trace")]
    pub fn recv_icmp_probe<S: Socket>(&self, recv_socket: &mut S) -> Result<Option<Response>> {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        match recv_socket.read(&mut buf) {
            Ok(bytes_read) => match extract_response(&buf[..bytes_read]) {
                Ok(resp) => Ok(resp),
                Err(Error::PacketError(err)) => {
                    tracing::debug!(?err, "discarded malformed packet");
                    Ok(None)
                }
                Err(err) => Err(err),
            },
            Err(err) => match err.kind() {
                ErrorKind::Std(io::ErrorKind::WouldBlock) => Ok(None),
                _ => Err(Error::IoError(err)),
            },
        }
    }

    /// Create an `Ipv4Packet`.
    fn make_ipv4_packet<'a>(
        &self,
        ipv4_buf: &'a mut [u8],
        ttl: u8,
        payload: &[u8],
    ) -> Result<Ipv4Packet<'a>> {
        let ipv4_total_length = (Ipv4Packet::minimum_packet_size() + payload.len()) as u16;
        let ipv4_total_length_header = self.byte_order.adjust_length(ipv4_total_length);
        let ipv4_flags_and_fragment_offset_header = self.byte_order.adjust_length(DONT_FRAGMENT);
        let mut ipv4 = Ipv4Packet::new(&mut ipv4_buf[..ipv4_total_length as usize])?;
        ipv4.set_version(4);
        ipv4.set_header_length(5);
        ipv4.set_total_length(ipv4_total_length_header);
        ipv4.set_ttl(ttl);
        ipv4.set_protocol(IpProtocol::Icmp);
        ipv4.set_source(self.src_addr);
        ipv4.set_destination(self.dest_addr);
        ipv4.set_payload(payload);
        ipv4.set_identification(0);
        ipv4.set_flags_and_fragment_offset(ipv4_flags_and_fragment_offset_header);
        Ok(ipv4)
    }
}

/// Create an ICMP `EchoRequest` packet.
fn make_echo_request_icmp_packet(
    icmp_buf: &mut [u8],
    identifier: TraceId,
    sequence: Sequence,
    payload_size: usize,
) -> Result<EchoRequestPacket<'_>> {
    let payload_buf = [0_u8; MAX_ICMP_PAYLOAD_BUF];
    let packet_size = IcmpPacket::minimum_packet_size() + payload_size;
    let mut icmp = EchoRequestPacket::new(&mut icmp_buf[..packet_size])?;
    icmp.set_icmp_type(IcmpType::EchoRequest);
    icmp.set_icmp_code(IcmpCode(0));
    icmp.set_identifier(identifier.0);
    icmp.set_payload(&payload_buf[..payload_size]);
    icmp.set_sequence(sequence.0);
    icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
    Ok(icmp)
}

/// Parse a received IPv4 packet and extract the probe response, if any.
fn extract_response(buf: &[u8]) -> Result<Option<Response>> {
    let ipv4 = Ipv4Packet::new_view(buf)?;
    extract_probe_resp(&ipv4)
}

/// Extract a `Response` from an incoming ICMP packet, if it is one of the types we expect.
///
/// For `TimeExceeded` and `DestinationUnreachable` the echo identifier and sequence are recovered
/// from the original `EchoRequest` packet nested within the payload; for `EchoReply` they are
/// read from the reply itself.
#[instrument(level = "trace")]
fn extract_probe_resp(ipv4: &Ipv4Packet<'_>) -> Result<Option<Response>> {
    let recv = Instant::now();
    let src = IpAddr::V4(ipv4.get_source());
    let icmp_v4 = IcmpPacket::new_view(ipv4.payload())?;
    let icmp_code = icmp_v4.get_icmp_code();
    Ok(match icmp_v4.get_icmp_type() {
        IcmpType::TimeExceeded => {
            if IcmpTimeExceededCode::from(icmp_code) == IcmpTimeExceededCode::TtlExpired {
                let packet = TimeExceededPacket::new_view(icmp_v4.packet())?;
                let nested_ipv4 = Ipv4Packet::new_view(packet.payload())?;
                extract_nested_echo_request(&nested_ipv4)?.map(|(identifier, sequence)| {
                    Response::TimeExceeded(ResponseData::new(recv, src, identifier, sequence))
                })
            } else {
                None
            }
        }
        IcmpType::DestinationUnreachable => {
            let packet = DestinationUnreachablePacket::new_view(icmp_v4.packet())?;
            let nested_ipv4 = Ipv4Packet::new_view(packet.payload())?;
            extract_nested_echo_request(&nested_ipv4)?.map(|(identifier, sequence)| {
                Response::DestinationUnreachable(
                    ResponseData::new(recv, src, identifier, sequence),
                    IcmpPacketCode(icmp_code.0),
                )
            })
        }
        IcmpType::EchoReply => {
            let packet = EchoReplyPacket::new_view(icmp_v4.packet())?;
            Some(Response::EchoReply(ResponseData::new(
                recv,
                src,
                packet.get_identifier(),
                packet.get_sequence(),
            )))
        }
        _ => None,
    })
}

/// Get the identifier and sequence from the original `EchoRequest` packet embedded in the payload.
#[instrument(level = "trace")]
fn extract_nested_echo_request(ipv4: &Ipv4Packet<'_>) -> Result<Option<(u16, u16)>> {
    Ok(match ipv4.get_protocol() {
        IpProtocol::Icmp => {
            let echo_request = EchoRequestPacket::new_view(ipv4.payload())?;
            if echo_request.get_icmp_type() == IcmpType::EchoRequest {
                Some((echo_request.get_identifier(), echo_request.get_sequence()))
            } else {
                None
            }
        }
        IpProtocol::Other(_) => None,
    })
}

const INVALID_INPUT_KIND: ErrorKind = ErrorKind::Std(io::ErrorKind::InvalidInput);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoResult;
    use crate::mocket_read;
    use crate::net::socket::MockSocket;
    use crate::types::TimeToLive;
    use mockall::predicate;
    use std::str::FromStr;
    use std::sync::Mutex;

    static MTX: Mutex<()> = Mutex::new(());

    // Test dispatching an IPv4/ICMP probe with the fixed 32 byte payload.
    #[test]
    fn test_dispatch_icmp_probe() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let probe = make_probe();
        let src_addr = Ipv4Addr::from_str("1.2.3.4")?;
        let dest_addr = Ipv4Addr::from_str("5.6.7.8")?;
        let expected_send_to_buf = hex_literal::hex!(
            "
            45 00 00 3c 00 00 40 00 0a 01 00 00 01 02 03 04
            05 06 07 08 08 00 70 93 04 d2 82 9a 00 00 00 00
            00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
            00 00 00 00 00 00 00 00 00 00 00 00
            "
        );
        let expected_send_to_addr = SocketAddr::new(IpAddr::V4(dest_addr), 0);

        let mut mocket = MockSocket::new();
        mocket
            .expect_send_to()
            .with(
                predicate::eq(expected_send_to_buf),
                predicate::eq(expected_send_to_addr),
            )
            .times(1)
            .returning(|_, _| Ok(()));

        let ipv4 = Ipv4 {
            src_addr,
            dest_addr,
            payload_size: PayloadSize(32),
            ..Default::default()
        };
        ipv4.dispatch_icmp_probe(&mut mocket, probe)?;
        Ok(())
    }

    #[test]
    fn test_dispatch_icmp_probe_invalid_packet_size() {
        let _m = MTX.lock();
        let probe = make_probe();
        let mut mocket = MockSocket::new();
        let ipv4 = Ipv4 {
            payload_size: PayloadSize(1020),
            ..Default::default()
        };
        let err = ipv4.dispatch_icmp_probe(&mut mocket, probe).unwrap_err();
        assert!(matches!(err, Error::InvalidPacketSize(1048)));
    }

    // Test receiving an IPv4/ICMP `TimeExceeded` response from an intermediate hop.
    #[test]
    fn test_recv_icmp_probe_time_exceeded() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let expected_read_buf = hex_literal::hex!(
            "
            45 00 00 38 00 00 00 00 40 01 00 00 0a 00 00 01
            01 02 03 04 0b 00 f4 ee 00 00 00 00 45 00 00 3c
            00 00 40 00 01 01 00 00 01 02 03 04 05 06 07 08
            08 00 70 93 04 d2 82 9a
            "
        );
        let mut mocket = MockSocket::new();
        mocket
            .expect_read()
            .times(1)
            .returning(mocket_read!(expected_read_buf));
        let ipv4 = Ipv4::default();
        let resp = ipv4.recv_icmp_probe(&mut mocket)?.unwrap();
        let Response::TimeExceeded(data) = resp else {
            panic!("expected TimeExceeded")
        };
        assert_eq!(IpAddr::from_str("10.0.0.1")?, data.addr);
        assert_eq!(1234, data.identifier);
        assert_eq!(33434, data.sequence);
        Ok(())
    }

    // Test receiving an IPv4/ICMP `EchoReply` response from the target.
    #[test]
    fn test_recv_icmp_probe_echo_reply() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let expected_read_buf = hex_literal::hex!(
            "
            45 00 00 1c 00 00 00 00 39 01 00 00 05 06 07 08
            01 02 03 04 00 00 78 93 04 d2 82 9a
            "
        );
        let mut mocket = MockSocket::new();
        mocket
            .expect_read()
            .times(1)
            .returning(mocket_read!(expected_read_buf));
        let ipv4 = Ipv4::default();
        let resp = ipv4.recv_icmp_probe(&mut mocket)?.unwrap();
        let Response::EchoReply(data) = resp else {
            panic!("expected EchoReply")
        };
        assert_eq!(IpAddr::from_str("5.6.7.8")?, data.addr);
        assert_eq!(1234, data.identifier);
        assert_eq!(33434, data.sequence);
        Ok(())
    }

    // Test receiving an IPv4/ICMP `DestinationUnreachable` (host unreachable) response.
    #[test]
    fn test_recv_icmp_probe_dest_unreachable() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let expected_read_buf = hex_literal::hex!(
            "
            45 00 00 38 00 00 00 00 40 01 00 00 0a 00 00 02
            01 02 03 04 03 01 f4 ee 00 00 00 00 45 00 00 3c
            00 00 40 00 01 01 00 00 01 02 03 04 05 06 07 08
            08 00 70 93 04 d2 82 9a
            "
        );
        let mut mocket = MockSocket::new();
        mocket
            .expect_read()
            .times(1)
            .returning(mocket_read!(expected_read_buf));
        let ipv4 = Ipv4::default();
        let resp = ipv4.recv_icmp_probe(&mut mocket)?.unwrap();
        let Response::DestinationUnreachable(data, code) = resp else {
            panic!("expected DestinationUnreachable")
        };
        assert_eq!(IpAddr::from_str("10.0.0.2")?, data.addr);
        assert_eq!(1234, data.identifier);
        assert_eq!(33434, data.sequence);
        assert_eq!(IcmpPacketCode(1), code);
        Ok(())
    }

    // Other ICMP types are ignored.
    #[test]
    fn test_recv_icmp_probe_other_type_ignored() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let expected_read_buf = hex_literal::hex!(
            "
            45 00 00 1c 00 00 00 00 39 01 00 00 05 06 07 08
            01 02 03 04 0d 00 78 93 04 d2 82 9a
            "
        );
        let mut mocket = MockSocket::new();
        mocket
            .expect_read()
            .times(1)
            .returning(mocket_read!(expected_read_buf));
        let ipv4 = Ipv4::default();
        assert!(ipv4.recv_icmp_probe(&mut mocket)?.is_none());
        Ok(())
    }

    // A time exceeded response whose nested original packet is truncated is discarded.
    #[test]
    fn test_recv_icmp_probe_truncated_nested_packet_ignored() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let expected_read_buf = hex_literal::hex!(
            "
            45 00 00 20 00 00 00 00 40 01 00 00 0a 00 00 01
            01 02 03 04 0b 00 f4 ee 00 00 00 00 45 00 00 3c
            "
        );
        let mut mocket = MockSocket::new();
        mocket
            .expect_read()
            .times(1)
            .returning(mocket_read!(expected_read_buf));
        let ipv4 = Ipv4::default();
        assert!(ipv4.recv_icmp_probe(&mut mocket)?.is_none());
        Ok(())
    }

    #[test]
    fn test_recv_icmp_probe_would_block() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let mut mocket = MockSocket::new();
        mocket.expect_read().times(1).returning(|_| {
            Err(crate::error::IoError::Other(
                io::Error::from(io::ErrorKind::WouldBlock),
                crate::error::IoOperation::Read,
            ))
        });
        let ipv4 = Ipv4::default();
        assert!(ipv4.recv_icmp_probe(&mut mocket)?.is_none());
        Ok(())
    }

    fn make_probe() -> Probe {
        Probe::new(
            Sequence(33434),
            TraceId(1234),
            TimeToLive(10),
            Instant::now(),
        )
    }
}
