use crate::*;
use std::borrow::Cow;
use std::convert::TryFrom;

/// An Ethernet II frame. The payload runs to the end of `data`, padding included.
#[derive(Clone, Debug)]
pub struct EthernetFrame {
    pub data: PacketData,
    pub payload_offset: usize,
}

impl EthernetFrame {
    pub fn from_buffer(frame: PacketData) -> Result<EthernetFrame, &'static str> {
        // dest MAC (6) | src MAC (6) | ether type (2)
        if frame.len() < ETHERNET_HEADER_LEN {
            return Err("Buffer ends before a full Ethernet header");
        }

        Ok(EthernetFrame {
            data: frame,
            payload_offset: ETHERNET_HEADER_LEN,
        })
    }

    /// A zeroed header with no payload.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
            payload_offset: ETHERNET_HEADER_LEN,
        }
    }

    /// Returns a header-only frame with the given addressing.
    pub fn new(dest: MacAddr, src: MacAddr, ether_type: u16) -> EthernetFrame {
        let mut frame = EthernetFrame::empty();
        frame.set_dest_mac(dest);
        frame.set_src_mac(src);
        frame.set_ether_type(ether_type);
        frame
    }

    fn mac_at(&self, offset: usize) -> MacAddr {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.data[offset..offset + 6]);
        MacAddr::new(bytes)
    }

    pub fn dest_mac(&self) -> MacAddr {
        self.mac_at(0)
    }

    pub fn src_mac(&self) -> MacAddr {
        self.mac_at(6)
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        self.data[..6].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.data[6..12].copy_from_slice(&mac.bytes);
    }

    pub fn ether_type(&self) -> u16 {
        read_u16(&self.data, 12)
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        write_u16(&mut self.data, 12, ether_type);
    }

    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.extend_from_slice(payload);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Wraps an IPv4 packet, copying its header and the bytes its total length covers.
    pub fn encap_ipv4(ipv4: &Ipv4Packet, dest: MacAddr, src: MacAddr) -> EthernetFrame {
        let mut frame = EthernetFrame::new(dest, src, IPV4_ETHER_TYPE);
        let end = ipv4.layer3_offset + ipv4.total_len() as usize;
        frame.set_payload(&ipv4.data[ipv4.layer3_offset..end]);
        frame
    }

    pub fn into_bytes(self) -> PacketData {
        self.data
    }
}

impl AsRef<[u8]> for EthernetFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialEq for EthernetFrame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for EthernetFrame {}

impl TryFrom<Ipv4Packet> for EthernetFrame {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        match packet.layer3_offset {
            ETHERNET_HEADER_LEN => EthernetFrame::from_buffer(packet.data),
            _ => Err("IPv4 packet was not received in an Ethernet frame"),
        }
    }
}

impl TryFrom<UdpSegment> for EthernetFrame {
    type Error = &'static str;

    fn try_from(segment: UdpSegment) -> Result<Self, Self::Error> {
        EthernetFrame::try_from(Ipv4Packet::try_from(segment)?)
    }
}
