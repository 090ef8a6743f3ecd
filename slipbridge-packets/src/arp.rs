use crate::*;
use std::convert::TryFrom;
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

/// Size of an ARP payload carrying Ethernet and IPv4 addresses.
pub const ARP_IPV4_PAYLOAD_LEN: usize = 28;

const HARDWARE_TYPE_OFFSET: usize = 0;
const PROTOCOL_TYPE_OFFSET: usize = 2;
const HARDWARE_ADDR_LEN_OFFSET: usize = 4;
const PROTOCOL_ADDR_LEN_OFFSET: usize = 5;
const OPCODE_OFFSET: usize = 6;
const ADDRESSES_OFFSET: usize = 8;

/// An ARP message (RFC 826) viewed in place inside the Ethernet frame that carries it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    /// A zeroed ARP message sized for the given address lengths, in a frame whose only
    /// non-zero header field is the ARP ether type.
    pub fn new(hardware_addr_len: u8, protocol_addr_len: u8) -> Self {
        let payload_len =
            ADDRESSES_OFFSET + (2 * hardware_addr_len as usize) + (2 * protocol_addr_len as usize);

        let mut frame = EthernetFrame::empty();
        frame.set_payload(&vec![0; payload_len]);
        frame.set_ether_type(ARP_ETHER_TYPE);

        let mut arp = ArpFrame { frame };
        arp.set_hardware_addr_len(hardware_addr_len);
        arp.set_protocol_addr_len(protocol_addr_len);
        arp
    }

    /// An Ethernet/IPv4 frame with hardware and protocol types filled in.
    pub fn ethernet_ipv4() -> Self {
        let mut arp = ArpFrame::new(6, 4);
        arp.set_hardware_type(ArpHardwareType::Ethernet as u16);
        arp.set_protocol_type(IPV4_ETHER_TYPE);
        arp
    }

    pub fn hardware_type(&self) -> u16 {
        read_u16(self.arp_data(), HARDWARE_TYPE_OFFSET)
    }

    pub fn protocol_type(&self) -> u16 {
        read_u16(self.arp_data(), PROTOCOL_TYPE_OFFSET)
    }

    pub fn hardware_addr_len(&self) -> u8 {
        self.arp_data()[HARDWARE_ADDR_LEN_OFFSET]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        self.arp_data()[PROTOCOL_ADDR_LEN_OFFSET]
    }

    pub fn opcode(&self) -> u16 {
        read_u16(self.arp_data(), OPCODE_OFFSET)
    }

    pub fn is_request(&self) -> bool {
        self.opcode() == ArpOp::Request as u16
    }

    pub fn sender_hardware_addr(&self) -> &[u8] {
        self.field(AddrField::SenderHardware)
    }

    pub fn sender_protocol_addr(&self) -> &[u8] {
        self.field(AddrField::SenderProtocol)
    }

    pub fn target_hardware_addr(&self) -> &[u8] {
        self.field(AddrField::TargetHardware)
    }

    pub fn target_protocol_addr(&self) -> &[u8] {
        self.field(AddrField::TargetProtocol)
    }

    pub fn sender_mac_addr(&self) -> Option<MacAddr> {
        self.mac_addr(self.sender_hardware_addr())
    }

    pub fn sender_ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4_addr(self.sender_protocol_addr())
    }

    pub fn target_mac_addr(&self) -> Option<MacAddr> {
        self.mac_addr(self.target_hardware_addr())
    }

    pub fn target_ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4_addr(self.target_protocol_addr())
    }

    pub fn set_hardware_type(&mut self, htype: u16) {
        write_u16(self.arp_data_mut(), HARDWARE_TYPE_OFFSET, htype);
    }

    pub fn set_protocol_type(&mut self, ptype: u16) {
        write_u16(self.arp_data_mut(), PROTOCOL_TYPE_OFFSET, ptype);
    }

    pub fn set_hardware_addr_len(&mut self, len: u8) {
        self.arp_data_mut()[HARDWARE_ADDR_LEN_OFFSET] = len;
    }

    pub fn set_protocol_addr_len(&mut self, len: u8) {
        self.arp_data_mut()[PROTOCOL_ADDR_LEN_OFFSET] = len;
    }

    pub fn set_opcode(&mut self, op: ArpOp) {
        write_u16(self.arp_data_mut(), OPCODE_OFFSET, op as u16);
    }

    // The setters below assume an Ethernet/IPv4 layout (hlen 6, plen 4).

    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) {
        self.field_mut(AddrField::SenderHardware)
            .copy_from_slice(&addr.bytes);
    }

    pub fn set_sender_protocol_addr(&mut self, addr: Ipv4Addr) {
        self.field_mut(AddrField::SenderProtocol)
            .copy_from_slice(&addr.octets());
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) {
        self.field_mut(AddrField::TargetHardware)
            .copy_from_slice(&addr.bytes);
    }

    pub fn set_target_protocol_addr(&mut self, addr: Ipv4Addr) {
        self.field_mut(AddrField::TargetProtocol)
            .copy_from_slice(&addr.octets());
    }

    pub fn ethernet(&self) -> &EthernetFrame {
        &self.frame
    }

    pub fn ethernet_mut(&mut self) -> &mut EthernetFrame {
        &mut self.frame
    }

    /// Unwraps the underlying Ethernet frame.
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    fn arp_data(&self) -> &[u8] {
        &self.frame.data[self.frame.payload_offset..]
    }

    fn arp_data_mut(&mut self) -> &mut [u8] {
        let offset = self.frame.payload_offset;
        &mut self.frame.data[offset..]
    }

    fn mac_addr(&self, bytes: &[u8]) -> Option<MacAddr> {
        if self.hardware_addr_len() != 6 {
            return None;
        }
        MacAddr::from_slice(bytes)
    }

    fn ipv4_addr(&self, bytes: &[u8]) -> Option<Ipv4Addr> {
        if self.protocol_addr_len() != 4 {
            return None;
        }
        Some(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    /// Byte span of an address field inside the ARP payload. The fields follow the fixed
    /// header in sender hardware, sender protocol, target hardware, target protocol order.
    fn span(&self, field: AddrField) -> (usize, usize) {
        let hlen = usize::from(self.hardware_addr_len());
        let plen = usize::from(self.protocol_addr_len());
        let (start, len) = match field {
            AddrField::SenderHardware => (0, hlen),
            AddrField::SenderProtocol => (hlen, plen),
            AddrField::TargetHardware => (hlen + plen, hlen),
            AddrField::TargetProtocol => (2 * hlen + plen, plen),
        };
        (ADDRESSES_OFFSET + start, ADDRESSES_OFFSET + start + len)
    }

    fn field(&self, field: AddrField) -> &[u8] {
        let (start, end) = self.span(field);
        &self.arp_data()[start..end]
    }

    fn field_mut(&mut self, field: AddrField) -> &mut [u8] {
        let (start, end) = self.span(field);
        &mut self.arp_data_mut()[start..end]
    }
}

#[derive(Clone, Copy)]
enum AddrField {
    SenderHardware,
    SenderProtocol,
    TargetHardware,
    TargetProtocol,
}

impl Default for ArpFrame {
    fn default() -> Self {
        ArpFrame::ethernet_ipv4()
    }
}

impl TryFrom<EthernetFrame> for ArpFrame {
    type Error = &'static str;

    /// Accepts frames with the ARP ether type whose payload covers the fixed header and both
    /// address pairs. Anything past that is padding.
    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err("Not an ARP frame");
        }

        let arp = ArpFrame { frame };
        let available = arp.arp_data().len();
        if available < ADDRESSES_OFFSET {
            return Err("ARP payload shorter than its fixed header");
        }

        let needed = arp.span(AddrField::TargetProtocol).1;
        if available < needed {
            return Err("ARP payload shorter than its address lengths require");
        }
        Ok(arp)
    }
}
