use crossbeam::atomic::AtomicCell;
use std::fmt;

/// Counters shared by the tick path and the frame receive path. Every field only ever grows.
#[derive(Default)]
pub struct BridgeStats {
    frames_received: AtomicCell<u64>,
    frames_sent: AtomicCell<u64>,
    arp_replies_sent: AtomicCell<u64>,
    arp_requests_sent: AtomicCell<u64>,
    serial_packets_in: AtomicCell<u64>,
    serial_bytes_out: AtomicCell<u64>,
    tx_busy_drops: AtomicCell<u64>,
    tx_bytes_dropped: AtomicCell<u64>,
    resolution_timeouts: AtomicCell<u64>,
    overruns: AtomicCell<u64>,
    link_errors: AtomicCell<u64>,
    malformed: AtomicCell<u64>,
}

/// Point in time copy of `BridgeStats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_sent: u64,
    pub arp_replies_sent: u64,
    pub arp_requests_sent: u64,
    pub serial_packets_in: u64,
    pub serial_bytes_out: u64,
    pub tx_busy_drops: u64,
    pub tx_bytes_dropped: u64,
    pub resolution_timeouts: u64,
    pub overruns: u64,
    pub link_errors: u64,
    pub malformed: u64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn frame_received(&self) {
        self.frames_received.fetch_add(1);
    }

    pub(crate) fn frame_sent(&self) {
        self.frames_sent.fetch_add(1);
    }

    pub(crate) fn arp_reply_sent(&self) {
        self.arp_replies_sent.fetch_add(1);
    }

    pub(crate) fn arp_request_sent(&self) {
        self.arp_requests_sent.fetch_add(1);
    }

    pub(crate) fn serial_packet_in(&self) {
        self.serial_packets_in.fetch_add(1);
    }

    pub(crate) fn serial_bytes_written(&self, count: usize) {
        self.serial_bytes_out.fetch_add(count as u64);
    }

    pub(crate) fn tx_busy(&self, dropped_bytes: usize) {
        self.tx_busy_drops.fetch_add(1);
        self.tx_bytes_dropped.fetch_add(dropped_bytes as u64);
    }

    pub(crate) fn resolution_timeout(&self) {
        self.resolution_timeouts.fetch_add(1);
    }

    pub(crate) fn overrun(&self) {
        self.overruns.fetch_add(1);
    }

    pub(crate) fn link_error(&self) {
        self.link_errors.fetch_add(1);
    }

    pub(crate) fn malformed(&self) {
        self.malformed.fetch_add(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(),
            frames_sent: self.frames_sent.load(),
            arp_replies_sent: self.arp_replies_sent.load(),
            arp_requests_sent: self.arp_requests_sent.load(),
            serial_packets_in: self.serial_packets_in.load(),
            serial_bytes_out: self.serial_bytes_out.load(),
            tx_busy_drops: self.tx_busy_drops.load(),
            tx_bytes_dropped: self.tx_bytes_dropped.load(),
            resolution_timeouts: self.resolution_timeouts.load(),
            overruns: self.overruns.load(),
            link_errors: self.link_errors.load(),
            malformed: self.malformed.load(),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx frames {} tx frames {} arp replies {} arp requests {} serial in {} \
             serial bytes out {} tx busy {} ({} bytes) arp timeouts {} overruns {} \
             link errors {} malformed {}",
            self.frames_received,
            self.frames_sent,
            self.arp_replies_sent,
            self.arp_requests_sent,
            self.serial_packets_in,
            self.serial_bytes_out,
            self.tx_busy_drops,
            self.tx_bytes_dropped,
            self.resolution_timeouts,
            self.overruns,
            self.link_errors,
            self.malformed
        )
    }
}
