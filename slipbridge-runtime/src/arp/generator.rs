use slipbridge_packets::{ArpFrame, ArpOp, MacAddr};
use std::net::Ipv4Addr;

/// Builds the ARP frames the bridge sends, always from our own MAC and IP.
#[derive(Clone, Debug)]
pub struct ArpGenerator {
    mac: MacAddr,
    ip: Ipv4Addr,
}

impl ArpGenerator {
    pub fn new(mac: MacAddr, ip: Ipv4Addr) -> Self {
        ArpGenerator { mac, ip }
    }

    /// Broadcast request asking who holds `target_ip`.
    pub fn request(&self, target_ip: Ipv4Addr) -> ArpFrame {
        let mut arp_frame = self.frame(ArpOp::Request);
        arp_frame.set_target_hardware_addr(MacAddr::BROADCAST);
        arp_frame.set_target_protocol_addr(target_ip);
        arp_frame
    }

    /// Answer to a request from `requester_mac`/`requester_ip` for our address. The reply is
    /// broadcast at the Ethernet layer and addressed to the requester in the ARP payload.
    pub fn reply(&self, requester_mac: MacAddr, requester_ip: Ipv4Addr) -> ArpFrame {
        let mut arp_frame = self.frame(ArpOp::Reply);
        arp_frame.set_target_hardware_addr(requester_mac);
        arp_frame.set_target_protocol_addr(requester_ip);
        arp_frame
    }

    fn frame(&self, op: ArpOp) -> ArpFrame {
        let mut arp_frame = ArpFrame::ethernet_ipv4();
        let ethernet = arp_frame.ethernet_mut();
        ethernet.set_dest_mac(MacAddr::BROADCAST);
        ethernet.set_src_mac(self.mac);

        arp_frame.set_opcode(op);
        arp_frame.set_sender_hardware_addr(self.mac);
        arp_frame.set_sender_protocol_addr(self.ip);
        arp_frame
    }
}
