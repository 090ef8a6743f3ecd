extern crate crossbeam;

/// Address resolution. Holds the fixed capacity IPv4 to MAC table shared by the receive path,
/// which learns from and answers ARP traffic, and the send path, which blocks briefly on
/// resolution before a packet can leave on the WiFi link.
pub mod arp;

/// The bridge itself. A `LinkBridge` is driven from two sides: the driver loop calls `tick` to
/// move packets from the serial line to WiFi, and the WiFi driver calls `on_frame_received`
/// for every inbound frame. Everything else in this crate exists to serve one of those calls.
pub mod bridge;

/// SLIP framing for the serial line.
pub mod codec;

/// Session configuration and the defaults used when a value is not given.
pub mod config;

/// Debug text sent out over the network.
pub mod debug;

/// DHCP client messages.
pub mod dhcp;

pub mod error;

/// The seams to the outside world: the WiFi link layer, the serial port and the clock. Hosts
/// provide real implementations; tests use the doubles in `utils::test`.
pub mod link;

/// Counters for everything the bridge drops, sends or fails on.
pub mod stats;

/// Utility module
pub mod utils;

pub use crate::bridge::LinkBridge;
pub use crate::config::BridgeConfig;
pub use crate::error::{BridgeError, LinkError};
pub use crate::link::{Clock, LinkLayer, SerialPort, SystemClock};
pub use crate::stats::{BridgeStats, StatsSnapshot};
