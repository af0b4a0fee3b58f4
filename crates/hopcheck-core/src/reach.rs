use crate::config::defaults;
use crate::error::{Error, Result};
use crate::net::common::ErrorMapper;
use crate::net::socket::{Socket, SocketError};
use crate::net::SocketImpl;
use crate::types::Port;
use hopcheck_dns::{Config, Resolver, SystemResolver};
use std::net::{IpAddr, SocketAddr};
use std::thread;
use std::time::{Duration, Instant};
use tracing::instrument;

/// The result of a TCP reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the connection was established.
    pub success: bool,
    /// A human readable description of the outcome.
    pub message: String,
    /// The time taken by the connection attempt.
    pub elapsed: Duration,
}

impl ValidationResult {
    fn success(addr: IpAddr, port: Port, elapsed: Duration) -> Self {
        Self {
            success: true,
            message: format!("Successfully connected to {addr}:{}", port.0),
            elapsed,
        }
    }

    fn failure(message: String, elapsed: Duration) -> Self {
        Self {
            success: false,
            message,
            elapsed,
        }
    }

    /// The elapsed time formatted as fractional milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> String {
        format!("{:.2}ms", self.elapsed.as_secs_f64() * 1000.0)
    }
}

/// Check whether a TCP connection can be established to `target` on `port`.
///
/// The target may be a hostname or a literal IP address.  Performs a single non-blocking
/// connect and polls the socket for writability until the connection completes, is refused or
/// the timeout elapses.  Resolution and connection failures are reported in the
/// `ValidationResult`, an `Err` is returned only if a socket operation itself fails.
///
/// # Errors
///
/// Returns an error if the socket cannot be created or polled.
pub fn check_connection(target: impl AsRef<str>, port: Port) -> Result<ValidationResult> {
    let resolver = SystemResolver::new(Config::new(defaults::DEFAULT_DNS_TIMEOUT));
    check_connection_with::<SocketImpl, _>(
        target.as_ref(),
        port,
        &resolver,
        defaults::DEFAULT_TCP_CONNECT_TIMEOUT,
    )
}

#[instrument(skip(resolver), level = "trace")]
fn check_connection_with<S: Socket, R: Resolver>(
    target: &str,
    port: Port,
    resolver: &R,
    timeout: Duration,
) -> Result<ValidationResult> {
    let start = Instant::now();
    let addr = match resolve(target, resolver) {
        Ok(addr) => addr,
        Err(err) => {
            return Ok(ValidationResult::failure(
                format!("Connection failed: {err}"),
                start.elapsed(),
            ))
        }
    };
    let remote = SocketAddr::new(addr, port.0);
    let mut socket = S::new_stream_socket_ipv4()?;
    if let Err(err) = socket
        .connect(remote)
        .map_err(Error::IoError)
        .or_else(ErrorMapper::in_progress)
    {
        return Ok(ValidationResult::failure(
            format!("Connection failed: {err}"),
            start.elapsed(),
        ));
    }
    while start.elapsed() < timeout {
        if socket.is_writable()? {
            return match socket.take_error()? {
                None => {
                    socket.shutdown()?;
                    Ok(ValidationResult::success(addr, port, start.elapsed()))
                }
                Some(SocketError::ConnectionRefused) => Ok(ValidationResult::failure(
                    String::from("Connection failed: connection refused"),
                    start.elapsed(),
                )),
                Some(SocketError::HostUnreachable) => Ok(ValidationResult::failure(
                    String::from("Connection failed: host unreachable"),
                    start.elapsed(),
                )),
                Some(SocketError::Other(err)) => Ok(ValidationResult::failure(
                    format!("Connection failed: {err}"),
                    start.elapsed(),
                )),
            };
        }
        thread::sleep(defaults::DEFAULT_READ_TIMEOUT);
    }
    Ok(ValidationResult::failure(
        String::from("Connection timed out"),
        start.elapsed(),
    ))
}

/// Resolve the target to an IPv4 address, accepting literal addresses as-is.
fn resolve<R: Resolver>(target: &str, resolver: &R) -> Result<IpAddr> {
    if let Ok(addr) = target.parse::<IpAddr>() {
        return Ok(addr);
    }
    resolver
        .lookup(target)?
        .into_iter()
        .find(IpAddr::is_ipv4)
        .ok_or_else(|| Error::AddrNotFound(String::from(target)))
}
