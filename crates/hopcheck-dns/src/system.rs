use crate::config::Config;
use crate::resolver::{DnsEntry, Error, ResolvedIpAddrs, Resolver, Result};
use crossbeam::channel::bounded;
use std::net::IpAddr;
use std::thread;

/// A blocking forward and reverse DNS resolver which uses the OS resolver.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    config: Config,
}

impl SystemResolver {
    /// Create a `SystemResolver`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the `Config`.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Resolver for SystemResolver {
    fn lookup(&self, hostname: impl AsRef<str>) -> Result<ResolvedIpAddrs> {
        let all = dns_lookup::lookup_host(hostname.as_ref())
            .map_err(|err| Error::LookupFailed(Box::new(err)))?;
        Ok(ResolvedIpAddrs(
            all.into_iter().filter(IpAddr::is_ipv4).collect(),
        ))
    }

    fn reverse_lookup(&self, addr: impl Into<IpAddr>) -> DnsEntry {
        let addr = addr.into();
        let (tx, rx) = bounded(1);
        // `lookup_addr` has no timeout of its own and so is run on a separate
        // thread which is abandoned if it does not reply in time.
        let spawned = thread::Builder::new()
            .name(format!("dns-reverse-{addr}"))
            .spawn(move || {
                let _ = tx.send(dns_lookup::lookup_addr(&addr));
            });
        if spawned.is_err() {
            return DnsEntry::Failed(addr);
        }
        match rx.recv_timeout(self.config.timeout) {
            // `lookup_addr` cannot distinguish a name which does not exist
            // from a genuine error and so all failures are `NotFound`.
            Ok(Ok(hostname)) => DnsEntry::Resolved(addr, vec![hostname]),
            Ok(Err(_)) => DnsEntry::NotFound(addr),
            Err(_) => DnsEntry::Timeout(addr),
        }
    }
}
