use std::net::IpAddr;
use std::time::Duration;

/// A single record in the trace of a path to a target host.
///
/// One record is produced for every time-to-live probed, in ascending order, followed by exactly
/// one terminal record which summarises the outcome of the trace.  Terminal records have a `hop`
/// of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopRecord {
    /// The 1-based hop this record describes, zero for the terminal record.
    pub hop: u8,
    /// The name to display for the hop.
    ///
    /// This is the reverse DNS name of the responding host where available, the responding
    /// address otherwise and a fixed label for hops which did not respond.
    pub display_name: String,
    /// The address of the responding host, if any.
    pub addr: Option<IpAddr>,
    /// The round-trip time of the probe, zero where no response was received.
    pub elapsed: Duration,
    /// Whether the hop responded.
    pub succeeded: bool,
    /// A diagnostic message for the hop, if any.
    pub detail: Option<String>,
}

impl HopRecord {
    /// A hop which responded to the probe.
    #[must_use]
    pub const fn answered(
        hop: u8,
        display_name: String,
        addr: IpAddr,
        elapsed: Duration,
    ) -> Self {
        Self {
            hop,
            display_name,
            addr: Some(addr),
            elapsed,
            succeeded: true,
            detail: None,
        }
    }

    /// A hop which did not respond to the probe.
    #[must_use]
    pub fn unanswered(hop: u8, detail: String) -> Self {
        Self {
            hop,
            display_name: "Request timed out".to_string(),
            addr: None,
            elapsed: Duration::ZERO,
            succeeded: false,
            detail: Some(detail),
        }
    }

    /// A hop at which the probe could not be sent.
    #[must_use]
    pub fn failed(hop: u8, detail: String) -> Self {
        Self {
            hop,
            display_name: "Error".to_string(),
            addr: None,
            elapsed: Duration::ZERO,
            succeeded: false,
            detail: Some(detail),
        }
    }

    /// The terminal record of a trace which reached the target.
    #[must_use]
    pub fn terminal_success() -> Self {
        Self {
            hop: 0,
            display_name: "Trace complete".to_string(),
            addr: None,
            elapsed: Duration::ZERO,
            succeeded: true,
            detail: None,
        }
    }

    /// The terminal record of a trace which did not reach the target.
    #[must_use]
    pub fn terminal_failure(target: &str, max_hops: u8) -> Self {
        Self {
            hop: 0,
            display_name: "Trace failed".to_string(),
            addr: None,
            elapsed: Duration::ZERO,
            succeeded: false,
            detail: Some(format!(
                "The host {target} was not reached.\nThe maximum hop count ({max_hops}) was reached or a network problem occurred."
            )),
        }
    }

    /// The terminal record of a trace which was cancelled.
    #[must_use]
    pub fn terminal_cancelled(target: &str) -> Self {
        Self {
            hop: 0,
            display_name: "Trace cancelled".to_string(),
            addr: None,
            elapsed: Duration::ZERO,
            succeeded: false,
            detail: Some(format!(
                "The trace to {target} was cancelled before completion."
            )),
        }
    }

    /// Whether this is the terminal record of a trace.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.hop == 0
    }

    /// The elapsed time formatted as fractional milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> String {
        format!("{:.2}ms", self.elapsed.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_answered() {
        let addr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let record = HopRecord::answered(3, String::from("router.local"), addr, Duration::from_millis(12));
        assert_eq!(3, record.hop);
        assert_eq!("router.local", record.display_name);
        assert_eq!(Some(addr), record.addr);
        assert!(record.succeeded);
        assert_eq!(None, record.detail);
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_unanswered_has_zero_elapsed() {
        let record = HopRecord::unanswered(7, String::from("no reply"));
        assert_eq!("Request timed out", record.display_name);
        assert_eq!(Duration::ZERO, record.elapsed);
        assert_eq!(None, record.addr);
        assert!(!record.succeeded);
        assert_eq!(Some(String::from("no reply")), record.detail);
    }

    #[test]
    fn test_failed_label() {
        let record = HopRecord::failed(1, String::from("boom"));
        assert_eq!("Error", record.display_name);
        assert!(!record.succeeded);
    }

    #[test]
    fn test_terminal_records() {
        assert!(HopRecord::terminal_success().is_terminal());
        assert!(HopRecord::terminal_success().succeeded);
        assert_eq!("Trace complete", HopRecord::terminal_success().display_name);
        assert_eq!(None, HopRecord::terminal_success().detail);
        let failed = HopRecord::terminal_failure("example.com", 30);
        assert!(failed.is_terminal());
        assert!(!failed.succeeded);
        let cancelled = HopRecord::terminal_cancelled("example.com");
        assert!(cancelled.is_terminal());
        assert!(!cancelled.succeeded);
    }

    #[test]
    fn test_elapsed_ms_format() {
        let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let record = HopRecord::answered(1, addr.to_string(), addr, Duration::from_micros(12_340));
        assert_eq!("12.34ms", record.elapsed_ms());
    }
}
