use crate::arp::{AddressTable, ArpGenerator};
use crate::config::{DEFAULT_ARP_POLL_INTERVAL, DEFAULT_ARP_TIMEOUT};
use crate::error::{BridgeError, Result};
use crate::link::{Clock, LinkLayer};
use crate::stats::BridgeStats;
use crate::utils::lock;
use log::{debug, warn};
use slipbridge_packets::MacAddr;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Finds the MAC for an IPv4 address, asking the network when the table does not know it.
///
/// The table lock is only taken for single lookups. While waiting the resolver pauses
/// through the `Clock`, which lets the receive path store the reply in the meantime.
pub struct ArpResolver<L: LinkLayer, C: Clock> {
    table: Arc<Mutex<AddressTable>>,
    generator: ArpGenerator,
    link: Arc<L>,
    clock: Arc<C>,
    stats: Arc<BridgeStats>,
    timeout: Duration,
    poll_interval: Duration,
}

impl<L: LinkLayer, C: Clock> ArpResolver<L, C> {
    pub fn new(
        table: Arc<Mutex<AddressTable>>,
        generator: ArpGenerator,
        link: Arc<L>,
        clock: Arc<C>,
        stats: Arc<BridgeStats>,
    ) -> Self {
        ArpResolver {
            table,
            generator,
            link,
            clock,
            stats,
            timeout: DEFAULT_ARP_TIMEOUT,
            poll_interval: DEFAULT_ARP_POLL_INTERVAL,
        }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        ArpResolver { timeout, ..self }
    }

    /// Time between table lookups while waiting for a reply. Never less than a millisecond.
    pub fn poll_interval(self, poll_interval: Duration) -> Self {
        ArpResolver {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            ..self
        }
    }

    /// Table lookup only, no traffic.
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        lock(&self.table).find_by_ip(ip).map(|binding| binding.mac)
    }

    /// Broadcasts a request for `ip` unless it is already bound.
    pub fn request(&self, ip: Ipv4Addr) -> Result<()> {
        if self.lookup(ip).is_some() {
            return Ok(());
        }
        let request = self.generator.request(ip);
        match self.link.send_frame(request.ethernet().as_ref()) {
            Ok(()) => {
                self.stats.arp_request_sent();
                debug!("Sent ARP request for {}", ip);
                Ok(())
            }
            Err(err) => {
                self.stats.link_error();
                Err(err.into())
            }
        }
    }

    /// `resolve_within` using the configured timeout.
    pub fn resolve_blocking(&self, ip: Ipv4Addr) -> Result<MacAddr> {
        self.resolve_within(ip, self.timeout)
    }

    /// Returns the MAC bound to `ip`, sending one ARP request and polling the table until a
    /// binding shows up or `timeout` has passed. Gives up with `NoRoute` no earlier than
    /// `timeout` and no later than one poll interval after it.
    pub fn resolve_within(&self, ip: Ipv4Addr, timeout: Duration) -> Result<MacAddr> {
        if let Some(mac) = self.lookup(ip) {
            return Ok(mac);
        }

        let deadline = self.clock.now_ms() + timeout.as_millis() as u64;

        // A lost request is not fatal, a reply may still arrive for someone else's request
        if let Err(err) = self.request(ip) {
            warn!("Failed to send ARP request for {}: {}", ip, err);
        }

        loop {
            if let Some(mac) = self.lookup(ip) {
                return Ok(mac);
            }
            let now = self.clock.now_ms();
            if now >= deadline {
                break;
            }
            let remaining = Duration::from_millis(deadline - now);
            self.clock.pause(self.poll_interval.min(remaining));
        }

        self.stats.resolution_timeout();
        warn!("ARP resolution for {} timed out after {:?}", ip, timeout);
        Err(BridgeError::NoRoute { ip })
    }
}
