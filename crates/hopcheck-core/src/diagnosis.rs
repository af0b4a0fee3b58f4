use crate::error::Error;
use crate::probe::IcmpPacketCode;
use crate::types::TimeToLive;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// The status of a single echo probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStatus {
    /// An echo reply was received from the target.
    Success,
    /// The probe ttl expired in transit.
    TtlExpired,
    /// No reply was received within the timeout.
    TimedOut,
    /// The destination host is unreachable.
    HostUnreachable,
    /// The destination network is unreachable.
    NetworkUnreachable,
    /// The destination is unreachable with some other code.
    Unreachable(IcmpPacketCode),
}

impl EchoStatus {
    /// The status for a destination unreachable response with the given code.
    #[must_use]
    pub const fn from_unreachable_code(code: IcmpPacketCode) -> Self {
        match code.0 {
            0 => Self::NetworkUnreachable,
            1 => Self::HostUnreachable,
            _ => Self::Unreachable(code),
        }
    }
}

impl Display for EchoStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "echo reply"),
            Self::TtlExpired => write!(f, "ttl expired"),
            Self::TimedOut => write!(f, "timed out"),
            Self::HostUnreachable => write!(f, "destination host unreachable"),
            Self::NetworkUnreachable => write!(f, "destination network unreachable"),
            Self::Unreachable(code) => write!(f, "unreachable (code {})", code.0),
        }
    }
}

/// Describe a probe status as a multi-line diagnostic message.
///
/// Each recognised status maps to a fixed template holding a one-line summary, the likely causes
/// and, for a timeout, the suggested actions.  Unrecognised statuses fall back to a one-line
/// summary of the raw status.
#[must_use]
pub fn diagnose(status: EchoStatus, ttl: TimeToLive, timeout: Duration, target: &str) -> String {
    match status {
        EchoStatus::TimedOut => render(
            format!("Request timed out (TTL: {})", ttl.0),
            &[
                String::from("A router or firewall is blocking ICMP packets"),
                format!("Network latency exceeded {}ms", timeout.as_millis()),
                format!("The target host ({target}) is not responding"),
            ],
            &[
                String::from("Increase the timeout"),
                String::from("Check firewall settings"),
                String::from("Check the network connection"),
            ],
        ),
        EchoStatus::HostUnreachable => render(
            format!("Destination host unreachable (TTL: {})", ttl.0),
            &[
                String::from("The target host is down"),
                String::from("A firewall on the target host is blocking requests"),
                String::from("The host address is incorrect"),
            ],
            &[],
        ),
        EchoStatus::NetworkUnreachable => render(
            format!("Destination network unreachable (TTL: {})", ttl.0),
            &[
                String::from("A routing table error occurred"),
                String::from("The network is partitioned"),
                String::from("The network is misconfigured"),
            ],
            &[],
        ),
        EchoStatus::TtlExpired => render(
            format!("TTL expired in transit (TTL: {})", ttl.0),
            &[
                String::from("The path has more hops than the TTL allows"),
                String::from("A routing loop exists"),
            ],
            &[],
        ),
        EchoStatus::Success | EchoStatus::Unreachable(_) => {
            format!("Status: {status} (TTL: {})", ttl.0)
        }
    }
}

/// Describe a failure to send a probe as a multi-line diagnostic message.
#[must_use]
pub fn diagnose_send_failure(ttl: TimeToLive, err: &Error) -> String {
    render(
        format!("Error occurred (TTL: {})\nDetails:\n{err}", ttl.0),
        &[],
        &[
            String::from("Check the network connection"),
            String::from("Check the host address"),
            String::from("Check firewall settings"),
        ],
    )
}

fn render(summary: String, causes: &[String], actions: &[String]) -> String {
    let mut out = summary;
    if !causes.is_empty() {
        out.push_str("\nPossible causes:");
        for (i, cause) in causes.iter().enumerate() {
            out.push_str(&format!("\n{}. {cause}", i + 1));
        }
    }
    if !actions.is_empty() {
        out.push_str("\nSuggested actions:");
        for (i, action) in actions.iter().enumerate() {
            out.push_str(&format!("\n{}. {action}", i + 1));
        }
    }
    out
}
