use crate::arp::{is_learnable, AddressTable, ArpGenerator};
use crate::link::Clock;
use crate::utils::lock;
use log::debug;
use slipbridge_packets::{ArpFrame, ArpHardwareType, IPV4_ETHER_TYPE};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

/// Learns bindings from inbound ARP frames and answers requests for our own address.
pub struct ArpHandler<C: Clock> {
    ip: Ipv4Addr,
    table: Arc<Mutex<AddressTable>>,
    generator: ArpGenerator,
    clock: Arc<C>,
}

impl<C: Clock> ArpHandler<C> {
    pub fn new(
        ip: Ipv4Addr,
        table: Arc<Mutex<AddressTable>>,
        generator: ArpGenerator,
        clock: Arc<C>,
    ) -> Self {
        ArpHandler {
            ip,
            table,
            generator,
            clock,
        }
    }

    ///
    /// Handles one inbound Ethernet/IPv4 ARP frame. Frames for other hardware or protocol
    /// types are ignored.
    ///
    /// A request whose target protocol address is ours produces a reply, which the caller
    /// transmits. Whatever the opcode, both the sender pair and the target pair are learned
    /// when they name a real station, so replies addressed to other hosts still teach us
    /// about both ends.
    ///
    pub fn handle(&self, arp_frame: &ArpFrame) -> Option<ArpFrame> {
        if arp_frame.hardware_type() != ArpHardwareType::Ethernet as u16
            || arp_frame.protocol_type() != IPV4_ETHER_TYPE
        {
            return None;
        }

        let sender = arp_frame
            .sender_mac_addr()
            .zip(arp_frame.sender_ipv4_addr())?;
        let target = arp_frame
            .target_mac_addr()
            .zip(arp_frame.target_ipv4_addr())?;

        let reply = if arp_frame.is_request() && target.1 == self.ip {
            debug!("ARP request for our address from {} ({})", sender.1, sender.0);
            Some(self.generator.reply(sender.0, sender.1))
        } else {
            None
        };

        let now = self.clock.now_ms();
        let mut table = lock(&self.table);
        for &(mac, ip) in [sender, target].iter() {
            if is_learnable(mac, ip) {
                let binding = table.upsert(mac, ip, now);
                if binding.mac == mac && binding.ip == ip {
                    debug!("Learned {} is at {}", ip, mac);
                }
            }
        }

        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::ManualClock;
    use slipbridge_packets::{ArpOp, MacAddr};

    const OUR_MAC: MacAddr = MacAddr {
        bytes: [2, 0, 0, 0, 0, 9],
    };
    const PEER_MAC: MacAddr = MacAddr {
        bytes: [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 1],
    };

    fn our_ip() -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, 9)
    }

    fn peer_ip() -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, 5)
    }

    fn handler() -> (ArpHandler<ManualClock>, Arc<Mutex<AddressTable>>) {
        let table = Arc::new(Mutex::new(AddressTable::new(10)));
        let clock = Arc::new(ManualClock::new(1000));
        let handler = ArpHandler::new(
            our_ip(),
            Arc::clone(&table),
            ArpGenerator::new(OUR_MAC, our_ip()),
            clock,
        );
        (handler, table)
    }

    #[test]
    fn answers_requests_for_our_address() {
        let (handler, table) = handler();
        let request = ArpGenerator::new(PEER_MAC, peer_ip()).request(our_ip());

        let reply = handler.handle(&request).unwrap();
        assert_eq!(reply.opcode(), ArpOp::Reply as u16);
        assert_eq!(reply.sender_mac_addr(), Some(OUR_MAC));
        assert_eq!(reply.sender_ipv4_addr(), Some(our_ip()));
        assert_eq!(reply.target_mac_addr(), Some(PEER_MAC));
        assert_eq!(reply.target_ipv4_addr(), Some(peer_ip()));

        // The requester is learned, the broadcast target is not
        let table = table.lock().unwrap();
        assert_eq!(table.find_by_ip(peer_ip()).unwrap().mac, PEER_MAC);
        assert_eq!(table.find_by_ip(peer_ip()).unwrap().created_at, 1000);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn ignores_requests_for_other_hosts() {
        let (handler, table) = handler();
        let request =
            ArpGenerator::new(PEER_MAC, peer_ip()).request(Ipv4Addr::new(10, 0, 0, 77));
        assert!(handler.handle(&request).is_none());
        assert_eq!(table.lock().unwrap().len(), 1);
    }

    #[test]
    fn learns_both_ends_of_replies() {
        let (handler, table) = handler();
        let other_mac = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 2]);
        let reply = ArpGenerator::new(PEER_MAC, peer_ip()).reply(other_mac, Ipv4Addr::new(10, 0, 0, 6));

        assert!(handler.handle(&reply).is_none());
        let table = table.lock().unwrap();
        assert_eq!(table.find_by_ip(peer_ip()).unwrap().mac, PEER_MAC);
        assert_eq!(
            table.find_by_ip(Ipv4Addr::new(10, 0, 0, 6)).unwrap().mac,
            other_mac
        );
    }

    #[test]
    fn skips_zero_and_broadcast_pairs() {
        let (handler, table) = handler();
        // Address conflict check: sender IP unset
        let check = ArpGenerator::new(PEER_MAC, Ipv4Addr::UNSPECIFIED).request(peer_ip());
        assert!(handler.handle(&check).is_none());
        assert!(table.lock().unwrap().is_empty());
    }

    #[test]
    fn ignores_non_ipv4_protocols() {
        let (handler, table) = handler();
        let mut request = ArpGenerator::new(PEER_MAC, peer_ip()).request(our_ip());
        request.set_protocol_type(0x86DD);
        assert!(handler.handle(&request).is_none());
        assert!(table.lock().unwrap().is_empty());
    }
}
