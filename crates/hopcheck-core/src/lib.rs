//! Hopcheck - a network path diagnostic library.
//!
//! This crate provides two network diagnostic primitives:
//!
//! - A hop-by-hop route tracer which discovers the path to a destination
//!   host by sending ICMP echo requests with incrementally increasing
//!   time-to-live values.
//! - A TCP reachability probe which times a connection attempt to a
//!   host and port.
//!
//! The tracer produces one [`HopRecord`] per hop probed, in ascending hop
//! order, followed by a single terminal record summarising the outcome.
//! Hops which do not reply, and failures to resolve the target or to open
//! the network channel, are reported as records with a diagnostic
//! explanation rather than as errors.
//!
//! Tracing requires the `CAP_NET_RAW` capability on Linux as it uses raw
//! sockets.
//!
//! # Example
//!
//! The following example builds and runs a tracer with default
//! configuration and prints each hop record as it is produced:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use hopcheck_core::Builder;
//!
//! Builder::new("example.com")
//!     .build()?
//!     .run_with(|record| println!("{record:?}"))?;
//! # Ok(())
//! # }
//! ```
//!
//! The following example checks whether a TCP connection can be
//! established:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use hopcheck_core::{check_connection, Port};
//!
//! let result = check_connection("example.com", Port(443))?;
//! println!("{} in {}", result.message, result.elapsed_ms());
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Tracer`].
//! - [`Tracer::run`] - Run the tracer on the current thread.
//! - [`Tracer::run_with`] - Run the tracer with a custom record handler.
//! - [`Tracer::spawn`] - Run the tracer on a new thread.
//! - [`check_connection`] - Check TCP reachability of a host and port.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::use_self,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod builder;
mod config;
mod constants;
mod diagnosis;
mod error;
mod net;
mod probe;
mod reach;
mod record;
mod strategy;
mod tracer;
mod types;
mod url;

pub use builder::Builder;
pub use config::defaults;
pub use constants::MAX_TTL;
pub use diagnosis::{diagnose, diagnose_send_failure, EchoStatus};
pub use error::{Error, IoError, Result};
pub use probe::{IcmpPacketCode, Probe, Response, ResponseData};
pub use reach::{check_connection, ValidationResult};
pub use record::HopRecord;
pub use tracer::Tracer;
pub use types::{MaxHops, PayloadSize, Port, Sequence, TimeToLive, TraceId};
pub use url::{HostUrl, NotAUrl};
