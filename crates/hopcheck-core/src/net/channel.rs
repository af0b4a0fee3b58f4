use crate::config::ChannelConfig;
use crate::error::{Error, Result};
use crate::net::socket::Socket;
use crate::net::{ipv4::Ipv4, platform, Network};
use crate::probe::{Probe, Response};
use hopcheck_packet::icmpv4::IcmpPacket;
use hopcheck_packet::ipv4::Ipv4Packet;
use std::time::Duration;
use tracing::instrument;

/// The maximum size of the IP packet we allow.
pub const MAX_PACKET_SIZE: usize = 1024;

/// A channel for sending and receiving ICMP `Probe` packets.
pub struct Channel<S: Socket> {
    read_timeout: Duration,
    send_socket: S,
    recv_socket: S,
    ipv4: Ipv4,
}

impl<S: Socket> Channel<S> {
    /// Create a `Channel`.
    ///
    /// This operation requires the `CAP_NET_RAW` capability on Linux.
    #[instrument(skip_all, level = "trace")]
    pub fn connect(config: &ChannelConfig) -> Result<Self> {
        tracing::debug!(?config);
        let packet_size = Ipv4Packet::minimum_packet_size()
            + IcmpPacket::minimum_packet_size()
            + usize::from(config.payload_size.0);
        if packet_size > MAX_PACKET_SIZE {
            return Err(Error::InvalidPacketSize(packet_size));
        }
        let byte_order = platform::Ipv4ByteOrder::for_address(config.source_addr)?;
        let send_socket = S::new_icmp_send_socket_ipv4()?;
        let recv_socket = S::new_recv_socket_ipv4(config.source_addr)?;
        let ipv4 = Ipv4 {
            src_addr: config.source_addr,
            dest_addr: config.target_addr,
            byte_order,
            payload_size: config.payload_size,
        };
        Ok(Self {
            read_timeout: config.read_timeout,
            send_socket,
            recv_socket,
            ipv4,
        })
    }
}

impl<S: Socket> Network for Channel<S> {
    #[instrument(skip(self), level = "trace")]
    fn send_probe(&mut self, probe: Probe) -> Result<()> {
        tracing::debug!(?probe);
        self.ipv4.dispatch_icmp_probe(&mut self.send_socket, probe)
    }

    /// Generate a `Response` for the next available ICMP packet, if any.
    #[instrument(skip_all, level = "trace")]
    fn recv_probe(&mut self) -> Result<Option<Response>> {
        let resp = if self.recv_socket.is_readable(self.read_timeout)? {
            self.ipv4.recv_icmp_probe(&mut self.recv_socket)?
        } else {
            None
        };
        if let Some(resp) = &resp {
            tracing::debug!(?resp);
        }
        Ok(resp)
    }
}
