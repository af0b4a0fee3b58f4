use crate::types::{Sequence, TimeToLive, TraceId};
use std::net::IpAddr;
use std::time::Instant;

/// Represents a network tracing probe.
///
/// A `Probe` is a packet sent across the network to trace the path to a target host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// The sequence of the probe.
    pub sequence: Sequence,
    /// The trace identifier.
    pub identifier: TraceId,
    /// The TTL of the probe.
    pub ttl: TimeToLive,
    /// Timestamp when the probe was sent.
    pub sent: Instant,
}

impl Probe {
    #[must_use]
    pub const fn new(
        sequence: Sequence,
        identifier: TraceId,
        ttl: TimeToLive,
        sent: Instant,
    ) -> Self {
        Self {
            sequence,
            identifier,
            ttl,
            sent,
        }
    }
}

/// The code of `TimeExceeded`, `EchoReply` and `Unreachable` ICMP packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpPacketCode(pub u8);

/// The response to a probe.
#[derive(Debug, Clone)]
pub enum Response {
    TimeExceeded(ResponseData),
    DestinationUnreachable(ResponseData, IcmpPacketCode),
    EchoReply(ResponseData),
}

impl Response {
    /// The response data.
    #[must_use]
    pub const fn data(&self) -> &ResponseData {
        match self {
            Self::TimeExceeded(data) | Self::DestinationUnreachable(data, _) | Self::EchoReply(data) => data,
        }
    }
}

/// The data in the probe response.
#[derive(Debug, Clone)]
pub struct ResponseData {
    /// Timestamp of the probe response.
    pub recv: Instant,
    /// The `IpAddr` that responded to the probe.
    pub addr: IpAddr,
    /// The ICMP identifier.
    pub identifier: u16,
    /// The ICMP sequence number.
    pub sequence: u16,
}

impl ResponseData {
    pub const fn new(recv: Instant, addr: IpAddr, identifier: u16, sequence: u16) -> Self {
        Self {
            recv,
            addr,
            identifier,
            sequence,
        }
    }
}
