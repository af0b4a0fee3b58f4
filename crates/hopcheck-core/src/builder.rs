use crate::config::defaults;
use crate::constants::{MAX_INITIAL_SEQUENCE, MAX_TTL};
use crate::error::Result;
use crate::net::channel::MAX_PACKET_SIZE;
use crate::types::{MaxHops, PayloadSize, Sequence, TraceId};
use crate::{Error, Tracer};
use hopcheck_packet::icmpv4::IcmpPacket;
use hopcheck_packet::ipv4::Ipv4Packet;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Build a tracer.
///
/// This is a convenience builder to simplify the creation and execution of a
/// tracer.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use hopcheck_core::Builder;
/// use std::time::Duration;
///
/// let tracer = Builder::new("example.com")
///     .max_hops(16)
///     .probe_timeout(Duration::from_secs(1))
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`Tracer`] - A hop-by-hop route tracer.
#[derive(Debug)]
pub struct Builder {
    target: String,
    source_addr: Option<Ipv4Addr>,
    trace_identifier: TraceId,
    max_hops: MaxHops,
    probe_timeout: Duration,
    read_timeout: Duration,
    payload_size: PayloadSize,
    initial_sequence: Sequence,
    dns_timeout: Duration,
}

impl Builder {
    /// Build a tracer builder for a given target host.
    ///
    /// The target may be a hostname or an IPv4 address literal, it is
    /// resolved when the tracer is run.
    ///
    /// # Examples
    ///
    /// Basic usage:
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source_addr: None,
            trace_identifier: TraceId::default(),
            max_hops: MaxHops(defaults::DEFAULT_MAX_HOPS),
            probe_timeout: defaults::DEFAULT_PROBE_TIMEOUT,
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
            payload_size: PayloadSize(defaults::DEFAULT_PAYLOAD_SIZE),
            initial_sequence: Sequence(defaults::DEFAULT_INITIAL_SEQUENCE),
            dns_timeout: defaults::DEFAULT_DNS_TIMEOUT,
        }
    }

    /// Set the source address.
    ///
    /// If not set then the source address will be discovered based on the
    /// target address.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    /// use std::net::Ipv4Addr;
    ///
    /// let source_addr = Ipv4Addr::new(192, 168, 1, 1);
    /// let tracer = Builder::new("example.com")
    ///     .source_addr(Some(source_addr))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn source_addr(self, source_addr: Option<Ipv4Addr>) -> Self {
        Self {
            source_addr,
            ..self
        }
    }

    /// Set the trace identifier.
    ///
    /// The trace identifier is carried in each ICMP echo request and used to
    /// correlate replies.  If not set then 0 will be used.
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").trace_identifier(12345).build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn trace_identifier(self, trace_id: u16) -> Self {
        Self {
            trace_identifier: TraceId(trace_id),
            ..self
        }
    }

    /// Set the maximum number of hops to probe.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").max_hops(16).build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn max_hops(self, max_hops: u8) -> Self {
        Self {
            max_hops: MaxHops(max_hops),
            ..self
        }
    }

    /// Set the per-probe timeout.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    /// use std::time::Duration;
    ///
    /// let tracer = Builder::new("example.com")
    ///     .probe_timeout(Duration::from_secs(1))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn probe_timeout(self, probe_timeout: Duration) -> Self {
        Self {
            probe_timeout,
            ..self
        }
    }

    /// Set the read timeout.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    /// use std::time::Duration;
    ///
    /// let tracer = Builder::new("example.com")
    ///     .read_timeout(Duration::from_millis(50))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    /// Set the ICMP payload size.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").payload_size(64).build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn payload_size(self, payload_size: u16) -> Self {
        Self {
            payload_size: PayloadSize(payload_size),
            ..self
        }
    }

    /// Set the initial sequence number.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").initial_sequence(35000).build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn initial_sequence(self, initial_sequence: u16) -> Self {
        Self {
            initial_sequence: Sequence(initial_sequence),
            ..self
        }
    }

    /// Set the DNS timeout.
    ///
    /// Bounds both the forward lookup of the target and the reverse lookup of
    /// each responding hop.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    /// use std::time::Duration;
    ///
    /// let tracer = Builder::new("example.com")
    ///     .dns_timeout(Duration::from_secs(1))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn dns_timeout(self, dns_timeout: Duration) -> Self {
        Self {
            dns_timeout,
            ..self
        }
    }

    /// Build the `Tracer`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").build()?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// This function will return `Error::BadConfig` if the configuration is invalid.
    pub fn build(self) -> Result<Tracer> {
        if self.target.is_empty() {
            return Err(Error::BadConfig("target may not be empty".to_string()));
        }
        if self.max_hops.0 == 0 {
            return Err(Error::BadConfig("max_hops may not be zero".to_string()));
        }
        if self.max_hops.0 > MAX_TTL {
            return Err(Error::BadConfig(format!(
                "max_hops {} > {MAX_TTL}",
                self.max_hops.0
            )));
        }
        if self.probe_timeout.is_zero() {
            return Err(Error::BadConfig(
                "probe_timeout may not be zero".to_string(),
            ));
        }
        if self.initial_sequence.0 > MAX_INITIAL_SEQUENCE {
            return Err(Error::BadConfig(format!(
                "initial_sequence {} > {MAX_INITIAL_SEQUENCE}",
                self.initial_sequence.0
            )));
        }
        let packet_size = Ipv4Packet::minimum_packet_size()
            + IcmpPacket::minimum_packet_size()
            + usize::from(self.payload_size.0);
        if packet_size > MAX_PACKET_SIZE {
            return Err(Error::BadConfig(format!(
                "packet size {packet_size} > {MAX_PACKET_SIZE}"
            )));
        }
        Ok(Tracer::new(
            self.target,
            self.source_addr,
            self.trace_identifier,
            self.max_hops,
            self.probe_timeout,
            self.read_timeout,
            self.payload_size,
            self.initial_sequence,
            self.dns_timeout,
            CancellationToken::new(),
        ))
    }
}
