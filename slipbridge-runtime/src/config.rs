use crate::codec::DEFAULT_MAX_FRAME_LEN;
use slipbridge_packets::MacAddr;
use std::net::Ipv4Addr;
use std::time::Duration;

pub const DEFAULT_ARP_TABLE_CAPACITY: usize = 10;
pub const DEFAULT_ARP_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_ARP_POLL_INTERVAL: Duration = Duration::from_millis(5);
pub const DEFAULT_ARP_FLUSH_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_TX_BUFFER_LEN: usize = 2048;

/// Identity and tuning of a bridge, fixed before `LinkBridge::init`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub arp_table_capacity: usize,
    pub arp_timeout: Duration,
    pub arp_poll_interval: Duration,
    pub arp_flush_interval: Duration,
    /// Largest packet the serial decoder reassembles.
    pub max_frame_len: usize,
    /// Largest Ethernet frame the bridge transmits.
    pub tx_buffer_len: usize,
}

impl BridgeConfig {
    pub fn new(mac: MacAddr, ip: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        BridgeConfig {
            mac,
            ip,
            netmask,
            gateway,
            arp_table_capacity: DEFAULT_ARP_TABLE_CAPACITY,
            arp_timeout: DEFAULT_ARP_TIMEOUT,
            arp_poll_interval: DEFAULT_ARP_POLL_INTERVAL,
            arp_flush_interval: DEFAULT_ARP_FLUSH_INTERVAL,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            tx_buffer_len: DEFAULT_TX_BUFFER_LEN,
        }
    }

    pub fn arp_table_capacity(self, arp_table_capacity: usize) -> Self {
        BridgeConfig {
            arp_table_capacity,
            ..self
        }
    }

    pub fn arp_timeout(self, arp_timeout: Duration) -> Self {
        BridgeConfig {
            arp_timeout,
            ..self
        }
    }

    pub fn arp_poll_interval(self, arp_poll_interval: Duration) -> Self {
        BridgeConfig {
            arp_poll_interval,
            ..self
        }
    }

    pub fn arp_flush_interval(self, arp_flush_interval: Duration) -> Self {
        BridgeConfig {
            arp_flush_interval,
            ..self
        }
    }

    pub fn max_frame_len(self, max_frame_len: usize) -> Self {
        BridgeConfig {
            max_frame_len,
            ..self
        }
    }

    pub fn tx_buffer_len(self, tx_buffer_len: usize) -> Self {
        BridgeConfig {
            tx_buffer_len,
            ..self
        }
    }

    /// The all ones host address of our subnet.
    pub fn subnet_broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.ip) | !u32::from(self.netmask))
    }
}
