//! Packet wire format parsing and building.
//!
//! The following packets are supported:
//! - `IPv4`
//! - `ICMPv4`
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order, converting as
//! necessary for the given architecture.
//!
//! # Example
//!
//! The following example parses an `IPv4` packet and asserts its fields:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use hopcheck_packet::ipv4::Ipv4Packet;
//!
//! let buf = hex_literal::hex!("45 00 00 3c 00 00 40 00 0a 01 00 00 01 02 03 04 05 06 07 08");
//! let packet = Ipv4Packet::new_view(&buf)?;
//! assert_eq!(4, packet.get_version());
//! assert_eq!(10, packet.get_ttl());
//! assert!(packet.payload().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! The following example builds an `ICMPv4` echo request packet:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use hopcheck_packet::checksum::icmp_ipv4_checksum;
//! use hopcheck_packet::icmpv4::echo_request::EchoRequestPacket;
//! use hopcheck_packet::icmpv4::{IcmpCode, IcmpPacket, IcmpType};
//!
//! let mut buf = [0; IcmpPacket::minimum_packet_size()];
//! let mut icmp = EchoRequestPacket::new(&mut buf)?;
//! icmp.set_icmp_type(IcmpType::EchoRequest);
//! icmp.set_icmp_code(IcmpCode(0));
//! icmp.set_identifier(2024);
//! icmp.set_sequence(1);
//! icmp.set_checksum(icmp_ipv4_checksum(icmp.packet()));
//! assert_eq!(icmp.packet(), &hex_literal::hex!("08 00 f0 16 07 e8 00 01"));
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// Functions for calculating network checksums.
pub mod checksum;

/// `ICMPv4` packets.
pub mod icmpv4;

/// `IPv4` packets.
pub mod ipv4;

/// The IP packet next layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    Other(u8),
}

impl IpProtocol {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::Other(id) => id,
        }
    }
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            p => Self::Other(p),
        }
    }
}

/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_protocol() {
        assert_eq!(1, IpProtocol::Icmp.id());
        assert_eq!(17, IpProtocol::Other(17).id());
        assert_eq!(IpProtocol::Icmp, IpProtocol::from(1));
        assert_eq!(IpProtocol::Other(6), IpProtocol::from(6));
    }

    #[test]
    fn test_fmt_payload() {
        assert_eq!("", fmt_payload(&[]));
        assert_eq!("00", fmt_payload(&[0x00]));
        assert_eq!("0a 1b 2c", fmt_payload(&[0x0a, 0x1b, 0x2c]));
    }
}
