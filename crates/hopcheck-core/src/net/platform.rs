pub mod byte_order;

pub use byte_order::Ipv4ByteOrder;
use std::net::Ipv4Addr;

#[cfg(unix)]
mod unix;

use crate::error::Result;
#[cfg(unix)]
pub use unix::*;

/// Platform specific operations.
#[cfg_attr(test, mockall::automock)]
pub trait Platform {
    /// Determine the required byte ordering for IPv4 header fields.
    ///
    /// This is used for the `total_length`, `flags` and `fragment_offset` fields of the IPv4
    /// header, which may vary between operating systems.
    fn byte_order_for_address(addr: Ipv4Addr) -> Result<Ipv4ByteOrder>;

    /// Discover a local `Ipv4Addr` which can route to the target address.
    ///
    /// No packets are sent, the local address is determined by connecting a UDP socket to the
    /// target address and reading back the socket local address.
    fn discover_local_addr(target_addr: Ipv4Addr, port: u16) -> Result<Ipv4Addr>;
}
