use crate::types::{MaxHops, PayloadSize, Sequence, TraceId};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `max-hops`.
    pub const DEFAULT_MAX_HOPS: u8 = 30;

    /// The default value for `probe-timeout`.
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

    /// The default value for `read-timeout`.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

    /// The default value for `payload-size`.
    ///
    /// A 32 byte payload matches the default used by common traceroute tooling
    /// so that traces are comparable.
    pub const DEFAULT_PAYLOAD_SIZE: u16 = 32;

    /// The default value for `initial-sequence`.
    pub const DEFAULT_INITIAL_SEQUENCE: u16 = 33434;

    /// The default timeout for a TCP reachability check.
    pub const DEFAULT_TCP_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

    /// The default timeout for DNS resolution.
    pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_millis(5000);
}

/// Tracer network channel configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChannelConfig {
    pub source_addr: Ipv4Addr,
    pub target_addr: Ipv4Addr,
    pub payload_size: PayloadSize,
    pub read_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            source_addr: Ipv4Addr::UNSPECIFIED,
            target_addr: Ipv4Addr::UNSPECIFIED,
            payload_size: PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Tracing strategy configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StrategyConfig {
    /// The target host as given by the caller, used for diagnostic messages.
    pub target: String,
    pub target_addr: Ipv4Addr,
    pub trace_identifier: TraceId,
    pub max_hops: MaxHops,
    pub probe_timeout: Duration,
    pub initial_sequence: Sequence,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            target_addr: Ipv4Addr::UNSPECIFIED,
            trace_identifier: TraceId::default(),
            max_hops: MaxHops(defaults::DEFAULT_MAX_HOPS),
            probe_timeout: defaults::DEFAULT_PROBE_TIMEOUT,
            initial_sequence: Sequence(defaults::DEFAULT_INITIAL_SEQUENCE),
        }
    }
}
