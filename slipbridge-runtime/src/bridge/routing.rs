//! Subnet arithmetic on 32 bit addresses.
//!
//! The `u32` forms take host byte order, which is what `u32::from(Ipv4Addr)` produces.
//! Mixing an address in wire order with a mask in host order gives wrong answers, so callers
//! holding raw wire bytes must convert both with `u32::from_be_bytes` first.

use std::net::Ipv4Addr;

/// Whether every host bit of `ip` (the bits outside `mask`) is set. The limited broadcast
/// address 255.255.255.255 is a broadcast under any mask. A /32 mask has no host bits, so
/// nothing else is a broadcast under it.
pub fn is_broadcast(ip: u32, mask: u32) -> bool {
    let host_bits = !mask;
    ip == u32::MAX || (host_bits != 0 && ip & host_bits == host_bits)
}

pub fn is_subnet_broadcast(ip: Ipv4Addr, netmask: Ipv4Addr) -> bool {
    is_broadcast(u32::from(ip), u32::from(netmask))
}

/// Whether `a` and `b` share the network prefix selected by `netmask`.
pub fn same_subnet(a: Ipv4Addr, b: Ipv4Addr, netmask: Ipv4Addr) -> bool {
    let mask = u32::from(netmask);
    u32::from(a) & mask == u32::from(b) & mask
}
