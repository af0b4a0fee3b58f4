use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use thiserror::Error;

/// A DNS resolver.
pub trait Resolver {
    /// Perform a blocking DNS hostname lookup and return the resolved IPv4 addresses.
    fn lookup(&self, hostname: impl AsRef<str>) -> Result<ResolvedIpAddrs>;

    /// Perform a blocking reverse DNS lookup of `IpAddr` and return a `DnsEntry`.
    #[must_use]
    fn reverse_lookup(&self, addr: impl Into<IpAddr>) -> DnsEntry;
}

/// A DNS resolver error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A DNS resolver error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("DNS lookup failed")]
    LookupFailed(Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// The output of a successful DNS lookup.
#[derive(Debug, Clone)]
pub struct ResolvedIpAddrs(pub(super) Vec<IpAddr>);

impl ResolvedIpAddrs {
    pub fn iter(&self) -> impl Iterator<Item = &'_ IpAddr> {
        self.0.iter()
    }
}

impl From<Vec<IpAddr>> for ResolvedIpAddrs {
    fn from(value: Vec<IpAddr>) -> Self {
        Self(value)
    }
}

impl IntoIterator for ResolvedIpAddrs {
    type Item = IpAddr;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The outcome of reverse DNS resolution.
#[derive(Debug, Clone)]
pub enum DnsEntry {
    /// The reverse DNS resolution of `IpAddr` has resolved.
    Resolved(IpAddr, Vec<String>),
    /// The `IpAddr` could not be resolved.
    NotFound(IpAddr),
    /// The reverse DNS resolution of `IpAddr` failed.
    Failed(IpAddr),
    /// The reverse DNS resolution of `IpAddr` timed out.
    Timeout(IpAddr),
}

/// The resolved hostnames of a `DnsEntry`.
#[derive(Debug, Clone)]
pub struct ResolvedHostnames<'a>(pub(super) std::slice::Iter<'a, String>);

impl<'a> Iterator for ResolvedHostnames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(String::as_str)
    }
}

impl DnsEntry {
    /// The resolved hostnames.
    #[must_use]
    pub fn hostnames(&self) -> ResolvedHostnames<'_> {
        match self {
            Self::Resolved(_, hosts) => ResolvedHostnames(hosts.iter()),
            Self::Timeout(_) | Self::NotFound(_) | Self::Failed(_) =>
            {
                #[expect(clippy::iter_on_empty_collections)]
                ResolvedHostnames([].iter())
            }
        }
    }
}

impl Display for DnsEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(_, hosts) => write!(f, "{}", hosts.join(" ")),
            Self::NotFound(ip) => write!(f, "{ip}"),
            Self::Failed(ip) => write!(f, "Failed: {ip}"),
            Self::Timeout(ip) => write!(f, "Timeout: {ip}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::str::FromStr;

    #[test]
    fn test_iterator_returns_each_hostname_once() {
        let entry = DnsEntry::Resolved(
            IpAddr::from_str("1.1.1.1").unwrap(),
            vec!["one".to_string(), "two".to_string(), "three".to_string()],
        );

        let mut iter = entry.hostnames();
        assert_eq!(iter.next(), Some("one"));
        assert_eq!(iter.next(), Some("two"));
        assert_eq!(iter.next(), Some("three"));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_hostnames_empty_for_unresolved() {
        let addr = IpAddr::from_str("10.0.0.1").unwrap();
        assert_eq!(DnsEntry::Failed(addr).hostnames().next(), None);
        assert_eq!(DnsEntry::Timeout(addr).hostnames().next(), None);
        assert_eq!(DnsEntry::NotFound(addr).hostnames().next(), None);
    }

    #[test]
    fn test_display() {
        let addr = IpAddr::from_str("10.0.0.1").unwrap();
        let entry = DnsEntry::Resolved(addr, vec!["one".to_string(), "two".to_string()]);
        assert_eq!("one two", format!("{entry}"));
        assert_eq!("10.0.0.1", format!("{}", DnsEntry::NotFound(addr)));
        assert_eq!("Failed: 10.0.0.1", format!("{}", DnsEntry::Failed(addr)));
        assert_eq!("Timeout: 10.0.0.1", format!("{}", DnsEntry::Timeout(addr)));
    }
}
