use crate::config::StrategyConfig;
use crate::diagnosis::{diagnose, diagnose_send_failure, EchoStatus};
use crate::error::{Error, Result};
use crate::net::Network;
use crate::probe::{Probe, Response, ResponseData};
use crate::record::HopRecord;
use crate::types::{Sequence, TimeToLive};
use hopcheck_dns::Resolver;
use std::net::IpAddr;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Trace the path to a target.
///
/// One probe is sent per time-to-live, in ascending order, and each probe must complete before
/// the next is sent.  The trace stops when the target replies, a probe cannot be sent, the
/// maximum hop count is reached or the trace is cancelled.
///
/// Each hop produces exactly one `HopRecord`, followed by a single terminal record which
/// summarises the outcome of the trace.  Records are published as they are produced.  Network
/// failures are surfaced as records, never as errors.
#[derive(Debug, Clone)]
pub struct Strategy<F> {
    config: StrategyConfig,
    publish: F,
}

/// The outcome of a whole trace.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Outcome {
    Reached,
    NotReached,
    Cancelled,
}

/// The outcome of probing a single hop.
#[derive(Debug)]
enum HopOutcome {
    /// The target replied.
    Reached(HopRecord),
    /// An intermediate hop replied with a ttl expired response.
    Relay(HopRecord),
    /// No usable reply was received within the timeout.
    NoReply(HopRecord),
    /// The probe could not be sent or received, fatal for the whole trace.
    Failed(HopRecord),
    /// The trace was cancelled while waiting.
    Cancelled,
}

/// The result of waiting for a probe reply.
#[derive(Debug)]
enum Wait {
    Reply(EchoStatus, ResponseData),
    TimedOut,
    Cancelled,
}

impl<F: Fn(&HopRecord)> Strategy<F> {
    #[instrument(skip_all, level = "trace")]
    pub fn new(config: &StrategyConfig, publish: F) -> Self {
        tracing::debug!(?config);
        Self {
            config: config.clone(),
            publish,
        }
    }

    /// Run the trace and return all records in emission order.
    #[instrument(skip_all, level = "trace")]
    pub fn run<N: Network, R: Resolver>(
        self,
        mut network: N,
        resolver: &R,
        cancelled: &CancellationToken,
    ) -> Vec<HopRecord> {
        let mut records = Vec::new();
        let mut outcome = Outcome::NotReached;
        for hop in 1..=self.config.max_hops.0 {
            if cancelled.is_cancelled() {
                outcome = Outcome::Cancelled;
                break;
            }
            let probe = Probe::new(
                self.sequence_for(hop),
                self.config.trace_identifier,
                TimeToLive(hop),
                Instant::now(),
            );
            match self.probe_hop(&mut network, resolver, cancelled, probe) {
                HopOutcome::Reached(record) => {
                    self.emit(&mut records, record);
                    outcome = Outcome::Reached;
                    break;
                }
                HopOutcome::Relay(record) | HopOutcome::NoReply(record) => {
                    self.emit(&mut records, record);
                }
                HopOutcome::Failed(record) => {
                    self.emit(&mut records, record);
                    break;
                }
                HopOutcome::Cancelled => {
                    outcome = Outcome::Cancelled;
                    break;
                }
            }
        }
        let terminal = match outcome {
            Outcome::Reached => HopRecord::terminal_success(),
            Outcome::NotReached => {
                HopRecord::terminal_failure(&self.config.target, self.config.max_hops.0)
            }
            Outcome::Cancelled => HopRecord::terminal_cancelled(&self.config.target),
        };
        self.emit(&mut records, terminal);
        records
    }

    /// Emit records for a trace which could not be started.
    ///
    /// Produces a single failing hop record holding the error diagnosis followed by the terminal
    /// failure record.
    #[instrument(skip_all, level = "trace")]
    pub fn fail(self, err: &Error) -> Vec<HopRecord> {
        let mut records = Vec::new();
        self.emit(
            &mut records,
            HopRecord::failed(1, diagnose_send_failure(TimeToLive(1), err)),
        );
        self.emit(
            &mut records,
            HopRecord::terminal_failure(&self.config.target, self.config.max_hops.0),
        );
        records
    }

    /// Probe a single hop and classify the result.
    fn probe_hop<N: Network, R: Resolver>(
        &self,
        network: &mut N,
        resolver: &R,
        cancelled: &CancellationToken,
        probe: Probe,
    ) -> HopOutcome {
        if let Err(err) = network.send_probe(probe) {
            return HopOutcome::Failed(HopRecord::failed(
                probe.ttl.0,
                diagnose_send_failure(probe.ttl, &err),
            ));
        }
        match self.await_reply(network, cancelled, probe) {
            Ok(Wait::Reply(EchoStatus::Success, data)) => {
                HopOutcome::Reached(self.answered(resolver, probe, &data))
            }
            Ok(Wait::Reply(EchoStatus::TtlExpired, data)) => {
                HopOutcome::Relay(self.answered(resolver, probe, &data))
            }
            Ok(Wait::Reply(status, _)) => HopOutcome::NoReply(self.unanswered(probe, status)),
            Ok(Wait::TimedOut) => HopOutcome::NoReply(self.unanswered(probe, EchoStatus::TimedOut)),
            Ok(Wait::Cancelled) => HopOutcome::Cancelled,
            Err(err) => HopOutcome::Failed(HopRecord::failed(
                probe.ttl.0,
                diagnose_send_failure(probe.ttl, &err),
            )),
        }
    }

    /// Wait for the reply to a probe, for up to the probe timeout.
    ///
    /// Replies which do not carry our trace identifier, or which answer another sequence, are
    /// ignored and the wait continues with the remaining time budget.
    fn await_reply<N: Network>(
        &self,
        network: &mut N,
        cancelled: &CancellationToken,
        probe: Probe,
    ) -> Result<Wait> {
        while probe.sent.elapsed() < self.config.probe_timeout {
            if cancelled.is_cancelled() {
                return Ok(Wait::Cancelled);
            }
            let Some(resp) = network.recv_probe()? else {
                continue;
            };
            let data = resp.data().clone();
            if data.identifier != self.config.trace_identifier.0
                || data.sequence != probe.sequence.0
            {
                tracing::debug!(?data, ?probe, "ignored response");
                continue;
            }
            let status = match resp {
                Response::TimeExceeded(_) => EchoStatus::TtlExpired,
                Response::DestinationUnreachable(_, code) => {
                    EchoStatus::from_unreachable_code(code)
                }
                Response::EchoReply(_) => EchoStatus::Success,
            };
            return Ok(Wait::Reply(status, data));
        }
        Ok(Wait::TimedOut)
    }

    /// A record for a hop which replied, with a best effort reverse lookup of the hop name.
    fn answered<R: Resolver>(&self, resolver: &R, probe: Probe, data: &ResponseData) -> HopRecord {
        let elapsed = data.recv.saturating_duration_since(probe.sent);
        HopRecord::answered(
            probe.ttl.0,
            display_name(resolver, data.addr),
            data.addr,
            elapsed,
        )
    }

    /// A record for a hop which did not usefully reply.
    fn unanswered(&self, probe: Probe, status: EchoStatus) -> HopRecord {
        HopRecord::unanswered(
            probe.ttl.0,
            diagnose(
                status,
                probe.ttl,
                self.config.probe_timeout,
                &self.config.target,
            ),
        )
    }

    fn emit(&self, records: &mut Vec<HopRecord>, record: HopRecord) {
        (self.publish)(&record);
        records.push(record);
    }

    fn sequence_for(&self, hop: u8) -> Sequence {
        Sequence(self.config.initial_sequence.0 + u16::from(hop) - 1)
    }
}

/// Reverse resolve an address to a display name, falling back to the literal address.
fn display_name<R: Resolver>(resolver: &R, addr: IpAddr) -> String {
    resolver
        .reverse_lookup(addr)
        .hostnames()
        .next()
        .map_or_else(|| addr.to_string(), ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IoError, IoOperation};
    use crate::net::MockNetwork;
    use crate::probe::IcmpPacketCode;
    use crate::types::{MaxHops, TraceId};
    use hopcheck_dns::{DnsEntry, ResolvedIpAddrs};
    use std::io;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;
    use std::time::Duration;

    static MTX: Mutex<()> = Mutex::new(());

    const TRACE_ID: u16 = 1234;
    const INITIAL_SEQUENCE: u16 = 33000;

    /// A resolver which never performs any IO.
    struct StubResolver(Option<&'static str>);

    impl Resolver for StubResolver {
        fn lookup(&self, _hostname: impl AsRef<str>) -> hopcheck_dns::Result<ResolvedIpAddrs> {
            unimplemented!()
        }
        fn reverse_lookup(&self, addr: impl Into<IpAddr>) -> DnsEntry {
            let addr = addr.into();
            match self.0 {
                Some(name) => DnsEntry::Resolved(addr, vec![name.to_string()]),
                None => DnsEntry::NotFound(addr),
            }
        }
    }

    fn config(max_hops: u8) -> StrategyConfig {
        StrategyConfig {
            target: String::from("example.com"),
            target_addr: Ipv4Addr::new(5, 6, 7, 8),
            trace_identifier: TraceId(TRACE_ID),
            max_hops: MaxHops(max_hops),
            probe_timeout: Duration::from_millis(10),
            initial_sequence: Sequence(INITIAL_SEQUENCE),
        }
    }

    fn time_exceeded(hop: u8, addr: Ipv4Addr) -> Response {
        Response::TimeExceeded(ResponseData::new(
            Instant::now(),
            IpAddr::V4(addr),
            TRACE_ID,
            INITIAL_SEQUENCE + u16::from(hop) - 1,
        ))
    }

    fn echo_reply(hop: u8, addr: Ipv4Addr) -> Response {
        Response::EchoReply(ResponseData::new(
            Instant::now(),
            IpAddr::V4(addr),
            TRACE_ID,
            INITIAL_SEQUENCE + u16::from(hop) - 1,
        ))
    }

    // A trace which never gets a reply yields one timed out record per ttl and a terminal
    // failure record.
    #[test]
    fn test_all_timed_out() {
        let _m = MTX.lock();
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(3).returning(|_| Ok(()));
        network.expect_recv_probe().returning(|| Ok(None));

        let strategy = Strategy::new(&config(3), |_| {});
        let records = strategy.run(network, &StubResolver(None), &CancellationToken::new());

        assert_eq!(4, records.len());
        for (i, record) in records[..3].iter().enumerate() {
            assert_eq!(u8::try_from(i).unwrap() + 1, record.hop);
            assert_eq!("Request timed out", record.display_name);
            assert!(!record.succeeded);
            assert_eq!(None, record.addr);
            assert_eq!(Duration::ZERO, record.elapsed);
        }
        let terminal = &records[3];
        assert!(terminal.is_terminal());
        assert!(!terminal.succeeded);
    }

    // A trace which reaches the target at ttl 3 yields exactly 3 hop records and a terminal
    // success record, with no probes sent for higher ttls.
    #[test]
    fn test_reached_at_ttl_3() {
        let _m = MTX.lock();
        let router1 = Ipv4Addr::new(10, 0, 0, 1);
        let router2 = Ipv4Addr::new(10, 0, 0, 2);
        let target = Ipv4Addr::new(5, 6, 7, 8);
        let mut seq = mockall::Sequence::new();
        let mut network = MockNetwork::new();
        for (hop, resp) in [
            (1, time_exceeded(1, router1)),
            (2, time_exceeded(2, router2)),
            (3, echo_reply(3, target)),
        ] {
            network
                .expect_send_probe()
                .withf(move |probe| probe.ttl == TimeToLive(hop))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
            network
                .expect_recv_probe()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move || Ok(Some(resp.clone())));
        }

        let strategy = Strategy::new(&config(5), |_| {});
        let records = strategy.run(
            network,
            &StubResolver(Some("router.local")),
            &CancellationToken::new(),
        );

        assert_eq!(4, records.len());
        for (i, record) in records[..3].iter().enumerate() {
            assert_eq!(u8::try_from(i).unwrap() + 1, record.hop);
            assert!(record.succeeded);
            assert_eq!("router.local", record.display_name);
            assert!(record.addr.is_some());
            assert_eq!(None, record.detail);
        }
        assert_eq!(Some(IpAddr::V4(target)), records[2].addr);
        let terminal = &records[3];
        assert!(terminal.is_terminal());
        assert!(terminal.succeeded);
        assert_eq!(None, terminal.detail);
    }

    // A send failure is fatal and truncates the trace at that hop.
    #[test]
    fn test_send_failure_is_fatal() {
        let _m = MTX.lock();
        let router1 = Ipv4Addr::new(10, 0, 0, 1);
        let mut seq = mockall::Sequence::new();
        let mut network = MockNetwork::new();
        network
            .expect_send_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        network
            .expect_recv_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move || Ok(Some(time_exceeded(1, router1))));
        network
            .expect_send_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(Error::ProbeFailed(IoError::Other(
                    io::Error::from(io::ErrorKind::PermissionDenied),
                    IoOperation::NewSocket,
                )))
            });

        let strategy = Strategy::new(&config(5), |_| {});
        let records = strategy.run(network, &StubResolver(None), &CancellationToken::new());

        assert_eq!(3, records.len());
        assert!(records[0].succeeded);
        assert_eq!("Error", records[1].display_name);
        assert_eq!(2, records[1].hop);
        assert!(!records[1].succeeded);
        assert!(records[1]
            .detail
            .as_ref()
            .unwrap()
            .contains("Check firewall settings"));
        assert!(records[2].is_terminal());
        assert!(!records[2].succeeded);
    }

    // Replies which do not match our trace identifier are ignored.
    #[test]
    fn test_mismatched_trace_id_ignored() {
        let _m = MTX.lock();
        let router1 = Ipv4Addr::new(10, 0, 0, 1);
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(1).returning(|_| Ok(()));
        network.expect_recv_probe().returning(move || {
            Ok(Some(Response::TimeExceeded(ResponseData::new(
                Instant::now(),
                IpAddr::V4(router1),
                999,
                INITIAL_SEQUENCE,
            ))))
        });

        let strategy = Strategy::new(&config(1), |_| {});
        let records = strategy.run(network, &StubResolver(None), &CancellationToken::new());

        assert_eq!(2, records.len());
        assert_eq!("Request timed out", records[0].display_name);
        assert!(!records[1].succeeded);
    }

    // A destination unreachable reply is recorded as an unanswered hop.
    #[test]
    fn test_host_unreachable() {
        let _m = MTX.lock();
        let router1 = Ipv4Addr::new(10, 0, 0, 1);
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(1).returning(|_| Ok(()));
        network.expect_recv_probe().times(1).returning(move || {
            Ok(Some(Response::DestinationUnreachable(
                ResponseData::new(
                    Instant::now(),
                    IpAddr::V4(router1),
                    TRACE_ID,
                    INITIAL_SEQUENCE,
                ),
                IcmpPacketCode(1),
            )))
        });

        let strategy = Strategy::new(&config(1), |_| {});
        let records = strategy.run(network, &StubResolver(None), &CancellationToken::new());

        assert_eq!(2, records.len());
        assert_eq!("Request timed out", records[0].display_name);
        assert!(!records[0].succeeded);
        let detail = records[0].detail.as_ref().unwrap();
        assert!(detail.starts_with("Destination host unreachable (TTL: 1)"));
    }

    // A cancelled trace stops immediately and emits only the cancelled terminal record.
    #[test]
    fn test_cancelled_before_start() {
        let _m = MTX.lock();
        let network = MockNetwork::new();
        let token = CancellationToken::new();
        token.cancel();

        let strategy = Strategy::new(&config(5), |_| {});
        let records = strategy.run(network, &StubResolver(None), &token);

        assert_eq!(1, records.len());
        assert!(records[0].is_terminal());
        assert!(!records[0].succeeded);
        assert_eq!("Trace cancelled", records[0].display_name);
    }

    // Cancellation between read timeout slices stops the trace while waiting for a reply.
    #[test]
    fn test_cancelled_while_waiting_for_reply() {
        let _m = MTX.lock();
        let token = CancellationToken::new();
        let recv_token = token.clone();
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(1).returning(|_| Ok(()));
        network.expect_recv_probe().times(1).returning(move || {
            recv_token.cancel();
            Ok(None)
        });

        let mut config = config(5);
        config.probe_timeout = Duration::from_secs(10);
        let strategy = Strategy::new(&config, |_| {});
        let records = strategy.run(network, &StubResolver(None), &token);

        assert_eq!(1, records.len());
        assert!(records[0].is_terminal());
        assert!(!records[0].succeeded);
        assert_eq!("Trace cancelled", records[0].display_name);
    }

    // A reply timestamped before the probe was sent clamps the elapsed time to zero.
    #[test]
    fn test_reply_before_send_clamps_elapsed_to_zero() {
        let _m = MTX.lock();
        let target = Ipv4Addr::new(5, 6, 7, 8);
        let before = Instant::now();
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(1).returning(|_| Ok(()));
        network.expect_recv_probe().times(1).returning(move || {
            Ok(Some(Response::EchoReply(ResponseData::new(
                before,
                IpAddr::V4(target),
                TRACE_ID,
                INITIAL_SEQUENCE,
            ))))
        });

        let strategy = Strategy::new(&config(1), |_| {});
        let records = strategy.run(network, &StubResolver(None), &CancellationToken::new());

        assert!(records[0].succeeded);
        assert_eq!(Duration::ZERO, records[0].elapsed);
    }

    // Reverse resolution failure never aborts a hop, the literal address is used instead.
    #[test]
    fn test_unresolved_hop_uses_literal_address() {
        let _m = MTX.lock();
        let target = Ipv4Addr::new(5, 6, 7, 8);
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(1).returning(|_| Ok(()));
        network
            .expect_recv_probe()
            .times(1)
            .returning(move || Ok(Some(echo_reply(1, target))));

        let strategy = Strategy::new(&config(5), |_| {});
        let records = strategy.run(network, &StubResolver(None), &CancellationToken::new());

        assert_eq!(2, records.len());
        assert_eq!("5.6.7.8", records[0].display_name);
        assert!(records[0].succeeded);
        assert!(records[1].succeeded);
    }

    // Records are published in the same order as they are returned.
    #[test]
    fn test_publish_order_matches_returned_order() {
        let _m = MTX.lock();
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(2).returning(|_| Ok(()));
        network.expect_recv_probe().returning(|| Ok(None));

        let published = Mutex::new(Vec::new());
        let strategy = Strategy::new(&config(2), |record: &HopRecord| {
            published.lock().unwrap().push(record.clone());
        });
        let records = strategy.run(network, &StubResolver(None), &CancellationToken::new());

        assert_eq!(records, *published.lock().unwrap());
    }

    // The fatal-as-data path emits one failing hop and the terminal failure record.
    #[test]
    fn test_fail() {
        let _m = MTX.lock();
        let strategy = Strategy::new(&config(3), |_| {});
        let records = strategy.fail(&Error::AddrNotFound(String::from("example.com")));

        assert_eq!(2, records.len());
        assert_eq!("Error", records[0].display_name);
        assert_eq!(1, records[0].hop);
        assert!(!records[0].succeeded);
        assert!(records[0]
            .detail
            .as_ref()
            .unwrap()
            .contains("no IPv4 address found for example.com"));
        assert!(records[1].is_terminal());
        assert!(!records[1].succeeded);
    }
}
