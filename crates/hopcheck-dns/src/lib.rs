//! This crate provides a blocking forward and reverse DNS resolver which
//! uses the OS resolver.
//!
//! Forward lookups return the resolved IPv4 addresses only.  Reverse
//! lookups are bounded by the configured timeout and return
//! `DnsEntry::Timeout` if the OS resolver does not reply in time.
//!
//! # Example
//!
//! The following example performs a forward DNS lookup and a reverse DNS
//! lookup of each resolved address.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use hopcheck_dns::{Config, Resolver, SystemResolver};
//!
//! let resolver = SystemResolver::new(Config::default());
//! for addr in resolver.lookup("example.com")? {
//!     let entry = resolver.reverse_lookup(addr);
//!     println!("lookup of {addr} returned {entry}");
//! }
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod config;
mod resolver;
mod system;

pub use config::Config;
pub use resolver::{DnsEntry, Error, ResolvedHostnames, ResolvedIpAddrs, Resolver, Result};
pub use system::SystemResolver;
