//! Debug text sent over the network, for a listener on the WiFi side when the serial line
//! is busy carrying packets.

use slipbridge_packets::{EthernetFrame, MacAddr, DEBUG_ETHER_TYPE};

pub const DEBUG_UDP_PORT: u16 = 7810;

/// Where `LinkBridge::send_debug` puts a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugSink {
    /// Raw Ethernet frame with ether type 0xBEEF, broadcast.
    EtherFrame,
    /// UDP datagram to the subnet broadcast address on `DEBUG_UDP_PORT`.
    Udp,
}

/// `message` as a NUL terminated byte string of at most `max_len` bytes, terminator
/// included. Longer messages are cut.
pub fn nul_terminated(message: &str, max_len: usize) -> Vec<u8> {
    if max_len == 0 {
        return Vec::new();
    }
    let text = &message.as_bytes()[..message.len().min(max_len - 1)];
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text);
    bytes.push(0);
    bytes
}

/// Broadcast debug frame from `src` carrying `text`.
pub fn debug_frame(src: MacAddr, text: &[u8]) -> EthernetFrame {
    let mut frame = EthernetFrame::new(MacAddr::BROADCAST, src, DEBUG_ETHER_TYPE);
    frame.set_payload(text);
    frame
}
