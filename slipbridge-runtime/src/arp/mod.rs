//! Address resolution: the IPv4 to MAC cache, the handler that learns from ARP traffic and
//! answers requests for our address, and the blocking resolver used on the send path.

use slipbridge_packets::MacAddr;
use std::net::Ipv4Addr;

mod table;
pub use self::table::*;

mod generator;
pub use self::generator::*;

mod handler;
pub use self::handler::*;

mod resolver;
pub use self::resolver::*;

/// Whether a MAC/IP pair seen in ARP traffic names a real station.
pub fn is_learnable(mac: MacAddr, ip: Ipv4Addr) -> bool {
    !mac.is_broadcast() && !mac.is_zero() && !ip.is_unspecified() && !ip.is_broadcast()
}
