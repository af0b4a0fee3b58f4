use crate::error::Result;
use crate::record::HopRecord;
use crate::types::{MaxHops, PayloadSize, Sequence, TraceId};
use crate::Error;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A hop-by-hop route tracer.
///
/// See the [`crate`] documentation for more information.
///
/// Note that this type is cheaply cloneable.
#[derive(Debug, Clone)]
pub struct Tracer {
    inner: Arc<inner::TracerInner>,
}

impl Tracer {
    /// Create a `Tracer`.
    ///
    /// Use the [`crate::Builder`] type to create a [`Tracer`].
    #[expect(clippy::too_many_arguments)]
    #[must_use]
    pub(crate) fn new(
        target: String,
        source_addr: Option<Ipv4Addr>,
        trace_identifier: TraceId,
        max_hops: MaxHops,
        probe_timeout: Duration,
        read_timeout: Duration,
        payload_size: PayloadSize,
        initial_sequence: Sequence,
        dns_timeout: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(inner::TracerInner::new(
                target,
                source_addr,
                trace_identifier,
                max_hops,
                probe_timeout,
                read_timeout,
                payload_size,
                initial_sequence,
                dns_timeout,
                token,
            )),
        }
    }

    /// Run the [`Tracer`] and return the ordered hop records.
    ///
    /// This method blocks until the trace completes.  One record is produced
    /// per hop probed, followed by a single terminal record.  Failures to
    /// resolve the target or to open the network channel are reported as
    /// records, not as errors.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").build()?;
    /// for record in tracer.run()? {
    ///     println!("{} {}", record.hop, record.display_name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # See Also
    ///
    /// - [`Tracer::run_with`] - Run the tracer with a custom record handler.
    /// - [`Tracer::spawn`] - Run the tracer on a new thread.
    pub fn run(&self) -> Result<Vec<HopRecord>> {
        self.inner.run()
    }

    /// Run the [`Tracer`] with a custom record handler.
    ///
    /// This method blocks until the trace completes.  The provided function is
    /// called for each record as it is produced, in hop order with the
    /// terminal record last, before the full sequence is returned.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let tracer = Builder::new("example.com").build()?;
    /// tracer.run_with(|record| println!("{record:?}"))?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # See Also
    ///
    /// - [`Tracer::run`] - Run the tracer without a custom record handler.
    pub fn run_with<F: Fn(&HopRecord)>(&self, func: F) -> Result<Vec<HopRecord>> {
        self.inner.run_with(func)
    }

    /// Spawn the tracer on a new thread.
    ///
    /// This method spawns a new thread to run the tracer and immediately
    /// returns the [`Tracer`] and a handle to the thread, so it may be joined
    /// with [`JoinHandle::join`].  While the trace is in flight a
    /// [`Tracer::snapshot`] of the records produced so far can be taken at any
    /// time and the trace can be stopped with [`Tracer::cancel`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use std::thread;
    /// # use std::time::Duration;
    /// use hopcheck_core::Builder;
    ///
    /// let (tracer, handle) = Builder::new("example.com").build()?.spawn()?;
    /// thread::sleep(Duration::from_secs(1));
    /// println!("so far: {:?}", tracer.snapshot());
    /// let _records = handle.join().unwrap()?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # See Also
    ///
    /// - [`Tracer::run`] - Run the tracer on the current thread.
    pub fn spawn(self) -> Result<(Self, JoinHandle<Result<Vec<HopRecord>>>)> {
        let tracer = self.clone();
        let handle = thread::Builder::new()
            .name(format!("tracer-{}", self.trace_identifier().0))
            .spawn(move || tracer.run())
            .map_err(|err| Error::Other(err.to_string()))?;
        Ok((self, handle))
    }

    /// Spawn the tracer with a custom record handler on a new thread.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use hopcheck_core::Builder;
    ///
    /// let (tracer, handle) = Builder::new("example.com")
    ///     .build()?
    ///     .spawn_with(|record| println!("{record:?}"))?;
    /// let _records = handle.join().unwrap()?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # See Also
    ///
    /// - [`Tracer::spawn`] - Spawn the tracer on a new thread without a custom record handler.
    pub fn spawn_with<F: Fn(&HopRecord) + Send + 'static>(
        self,
        func: F,
    ) -> Result<(Self, JoinHandle<Result<Vec<HopRecord>>>)> {
        let tracer = self.clone();
        let handle = thread::Builder::new()
            .name(format!("tracer-{}", self.trace_identifier().0))
            .spawn(move || tracer.run_with(func))
            .map_err(|err| Error::Other(err.to_string()))?;
        Ok((self, handle))
    }

    /// Cancel a trace in flight.
    ///
    /// The trace stops at the next hop boundary or read timeout slice and
    /// emits a cancelled terminal record.  Cancelling a tracer which is not
    /// running has no effect.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Take a snapshot of the records produced so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HopRecord> {
        self.inner.snapshot()
    }

    /// The target host of the tracer.
    #[must_use]
    pub fn target(&self) -> &str {
        self.inner.target()
    }

    /// The source address of the tracer.
    ///
    /// This is not set until the tracer is run.
    #[must_use]
    pub fn source_addr(&self) -> Option<Ipv4Addr> {
        self.inner.source_addr()
    }

    /// The trace identifier of the tracer.
    #[must_use]
    pub fn trace_identifier(&self) -> TraceId {
        self.inner.trace_identifier()
    }

    /// The maximum number of hops of the tracer.
    #[must_use]
    pub fn max_hops(&self) -> MaxHops {
        self.inner.max_hops()
    }

    /// The probe timeout of the tracer.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        self.inner.probe_timeout()
    }

    /// The read timeout of the tracer.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.inner.read_timeout()
    }

    /// The ICMP payload size of the tracer.
    #[must_use]
    pub fn payload_size(&self) -> PayloadSize {
        self.inner.payload_size()
    }

    /// The initial sequence number of the tracer.
    #[must_use]
    pub fn initial_sequence(&self) -> Sequence {
        self.inner.initial_sequence()
    }

    /// The DNS timeout of the tracer.
    #[must_use]
    pub fn dns_timeout(&self) -> Duration {
        self.inner.dns_timeout()
    }
}

mod inner {
    use crate::config::{ChannelConfig, StrategyConfig};
    use crate::error::{Error, Result};
    use crate::net::channel::Channel;
    use crate::net::source::SourceAddr;
    use crate::net::{PlatformImpl, SocketImpl};
    use crate::record::HopRecord;
    use crate::strategy::Strategy;
    use crate::types::{MaxHops, PayloadSize, Sequence, TraceId};
    use hopcheck_dns::{Config, Resolver, SystemResolver};
    use parking_lot::RwLock;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::OnceLock;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing::instrument;

    #[derive(Debug)]
    pub(super) struct TracerInner {
        target: String,
        source_addr: Option<Ipv4Addr>,
        trace_identifier: TraceId,
        max_hops: MaxHops,
        probe_timeout: Duration,
        read_timeout: Duration,
        payload_size: PayloadSize,
        initial_sequence: Sequence,
        dns_timeout: Duration,
        token: CancellationToken,
        records: RwLock<Vec<HopRecord>>,
        src: OnceLock<Ipv4Addr>,
    }

    impl TracerInner {
        #[expect(clippy::too_many_arguments)]
        pub(super) fn new(
            target: String,
            source_addr: Option<Ipv4Addr>,
            trace_identifier: TraceId,
            max_hops: MaxHops,
            probe_timeout: Duration,
            read_timeout: Duration,
            payload_size: PayloadSize,
            initial_sequence: Sequence,
            dns_timeout: Duration,
            token: CancellationToken,
        ) -> Self {
            Self {
                target,
                source_addr,
                trace_identifier,
                max_hops,
                probe_timeout,
                read_timeout,
                payload_size,
                initial_sequence,
                dns_timeout,
                token,
                records: RwLock::new(Vec::new()),
                src: OnceLock::new(),
            }
        }

        #[instrument(skip_all, level = "trace")]
        pub(super) fn run(&self) -> Result<Vec<HopRecord>> {
            self.run_internal(|_| ())
        }

        #[instrument(skip_all, level = "trace")]
        pub(super) fn run_with<F: Fn(&HopRecord)>(&self, func: F) -> Result<Vec<HopRecord>> {
            self.run_internal(func)
        }

        pub(super) fn cancel(&self) {
            self.token.cancel();
        }

        pub(super) fn snapshot(&self) -> Vec<HopRecord> {
            self.records.read().clone()
        }

        pub(super) fn target(&self) -> &str {
            &self.target
        }

        pub(super) fn source_addr(&self) -> Option<Ipv4Addr> {
            self.src.get().copied()
        }

        pub(super) const fn trace_identifier(&self) -> TraceId {
            self.trace_identifier
        }

        pub(super) const fn max_hops(&self) -> MaxHops {
            self.max_hops
        }

        pub(super) const fn probe_timeout(&self) -> Duration {
            self.probe_timeout
        }

        pub(super) const fn read_timeout(&self) -> Duration {
            self.read_timeout
        }

        pub(super) const fn payload_size(&self) -> PayloadSize {
            self.payload_size
        }

        pub(super) const fn initial_sequence(&self) -> Sequence {
            self.initial_sequence
        }

        pub(super) const fn dns_timeout(&self) -> Duration {
            self.dns_timeout
        }

        #[instrument(skip_all, level = "trace")]
        fn run_internal<F: Fn(&HopRecord)>(&self, func: F) -> Result<Vec<HopRecord>> {
            self.records.write().clear();
            let resolver = SystemResolver::new(Config::new(self.dns_timeout));
            let publish = |record: &HopRecord| {
                self.records.write().push(record.clone());
                func(record);
            };
            let records = match self.connect(&resolver) {
                Ok((target_addr, channel)) => {
                    let config = self.make_strategy_config(target_addr);
                    Strategy::new(&config, publish).run(channel, &resolver, &self.token)
                }
                Err(err) => {
                    let config = self.make_strategy_config(Ipv4Addr::UNSPECIFIED);
                    Strategy::new(&config, publish).fail(&err)
                }
            };
            Ok(records)
        }

        /// Resolve the target and open the network channel.
        fn connect(&self, resolver: &SystemResolver) -> Result<(Ipv4Addr, Channel<SocketImpl>)> {
            let target_addr = resolver
                .lookup(&self.target)?
                .into_iter()
                .find_map(|addr| match addr {
                    IpAddr::V4(addr) => Some(addr),
                    IpAddr::V6(_) => None,
                })
                .ok_or_else(|| Error::AddrNotFound(self.target.clone()))?;
            // if we are given a source address, validate it, otherwise
            // discover it based on the target address.
            let source_addr = match self.source_addr {
                None => SourceAddr::discover::<PlatformImpl>(target_addr)?,
                Some(addr) => SourceAddr::validate::<SocketImpl>(addr)?,
            };
            self.src
                .set(source_addr)
                .map_err(|_| Error::Other(String::from("failed to set source_addr")))?;
            let channel_config = self.make_channel_config(source_addr, target_addr);
            let channel = Channel::<SocketImpl>::connect(&channel_config)?;
            Ok((target_addr, channel))
        }

        const fn make_channel_config(
            &self,
            source_addr: Ipv4Addr,
            target_addr: Ipv4Addr,
        ) -> ChannelConfig {
            ChannelConfig {
                source_addr,
                target_addr,
                payload_size: self.payload_size,
                read_timeout: self.read_timeout,
            }
        }

        fn make_strategy_config(&self, target_addr: Ipv4Addr) -> StrategyConfig {
            StrategyConfig {
                target: self.target.clone(),
                target_addr,
                trace_identifier: self.trace_identifier,
                max_hops: self.max_hops,
                probe_timeout: self.probe_timeout,
                initial_sequence: self.initial_sequence,
            }
        }
    }
}
