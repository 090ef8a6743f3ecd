use crate::*;
use std::borrow::Cow;
use std::convert::TryFrom;
use std::net::Ipv4Addr;

/// TTL stamped on every header this crate builds.
pub const DEFAULT_TTL: u8 = 127;

const TOS: usize = 1;
const TOTAL_LEN: usize = 2;
const IDENT: usize = 4;
const FLAGS_FRAGMENT: usize = 6;
const TTL: usize = 8;
const PROTOCOL: usize = 9;
const CHECKSUM: usize = 10;
const SRC: usize = 12;
const DEST: usize = 16;

/// An IPv4 header and payload starting at `layer3_offset` of a shared buffer.
#[derive(Clone, Debug)]
pub struct Ipv4Packet {
    pub data: PacketData,
    pub layer3_offset: usize,
    pub payload_offset: usize,
}

impl Ipv4Packet {
    /// Validates the IPv4 header found at `layer3_offset` of `data`. Trailing bytes past the
    /// total length (Ethernet padding) are tolerated.
    pub fn from_buffer(data: PacketData, layer3_offset: usize) -> Result<Ipv4Packet, &'static str> {
        let header = match data.get(layer3_offset..) {
            Some(rest) if rest.len() >= IPV4_HEADER_LEN => rest,
            _ => return Err("Buffer ends before a minimal IPv4 header"),
        };

        if header[0] >> 4 != 4 {
            return Err("IP version field is not 4");
        }

        let header_len = usize::from(header[0] & 0x0F) * 4;
        if header_len < IPV4_HEADER_LEN {
            return Err("IPv4 header length field below 5 words");
        }

        let total_len = usize::from(read_u16(header, TOTAL_LEN));
        if total_len < header_len || total_len > header.len() {
            return Err("IPv4 total length disagrees with the buffer");
        }

        Ok(Ipv4Packet {
            data,
            layer3_offset,
            payload_offset: layer3_offset + header_len,
        })
    }

    /// Builds a UDP datagram with a fresh 20 byte header: no options, no fragmentation,
    /// TTL 127 and a valid header checksum.
    pub fn encap_udp(
        segment: &UdpSegment,
        src: Ipv4Addr,
        dest: Ipv4Addr,
        identification: u16,
    ) -> Ipv4Packet {
        let mut data = vec![0; IPV4_HEADER_LEN];
        data[0] = 0x45;
        data[8] = DEFAULT_TTL;
        data[9] = u8::from(IpProtocol::UDP);

        let mut packet = Ipv4Packet {
            data,
            layer3_offset: 0,
            payload_offset: IPV4_HEADER_LEN,
        };
        packet.set_identification(identification);
        packet.set_src_addr(src);
        packet.set_dest_addr(dest);
        packet.set_payload(&segment.data[segment.layer4_offset..]);
        packet.set_checksum();
        packet
    }

    fn addr_at(&self, field: usize) -> Ipv4Addr {
        let o = self.layer3_offset + field;
        Ipv4Addr::new(self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3])
    }

    fn set_addr_at(&mut self, field: usize, addr: Ipv4Addr) {
        let o = self.layer3_offset + field;
        self.data[o..o + 4].copy_from_slice(&addr.octets());
    }

    fn byte(&self, field: usize) -> u8 {
        self.data[self.layer3_offset + field]
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.addr_at(SRC)
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.set_addr_at(SRC, addr);
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        self.addr_at(DEST)
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.set_addr_at(DEST, addr);
    }

    /// Header length in 32 bit words.
    pub fn ihl(&self) -> u8 {
        self.byte(0) & 0x0F
    }

    /// Bytes between the header and the end given by the total length field.
    pub fn payload(&self) -> Cow<[u8]> {
        let end = self.layer3_offset + usize::from(self.total_len());
        Cow::from(&self.data[self.payload_offset..end])
    }

    /// Replaces the payload and rewrites the total length field. The checksum is left alone.
    /// Callers keep header plus payload within the 16 bit total length.
    pub fn set_payload(&mut self, payload: &[u8]) {
        let header_len = self.payload_offset - self.layer3_offset;
        self.data.truncate(self.payload_offset);
        self.data.extend_from_slice(payload);
        let total_len = (header_len + payload.len()) as u16;
        write_u16(&mut self.data, self.layer3_offset + TOTAL_LEN, total_len);
    }

    pub fn options(&self) -> Option<Cow<[u8]>> {
        let options_start = self.layer3_offset + IPV4_HEADER_LEN;
        if self.payload_offset > options_start {
            Some(Cow::from(&self.data[options_start..self.payload_offset]))
        } else {
            None
        }
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.byte(PROTOCOL))
    }

    pub fn total_len(&self) -> u16 {
        read_u16(&self.data, self.layer3_offset + TOTAL_LEN)
    }

    pub fn ttl(&self) -> u8 {
        self.byte(TTL)
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.data[self.layer3_offset + TTL] = ttl;
    }

    pub fn checksum(&self) -> u16 {
        read_u16(&self.data, self.layer3_offset + CHECKSUM)
    }

    pub fn dscp(&self) -> u8 {
        self.byte(TOS) >> 2
    }

    pub fn ecn(&self) -> u8 {
        self.byte(TOS) & 0b11
    }

    pub fn identification(&self) -> u16 {
        read_u16(&self.data, self.layer3_offset + IDENT)
    }

    pub fn set_identification(&mut self, identification: u16) {
        write_u16(&mut self.data, self.layer3_offset + IDENT, identification);
    }

    /// Fragment offset in units of 8 bytes.
    pub fn fragment_offset(&self) -> u16 {
        read_u16(&self.data, self.layer3_offset + FLAGS_FRAGMENT) & 0x1FFF
    }

    /// `(don't fragment, more fragments)`
    pub fn flags(&self) -> (bool, bool) {
        let flags = self.byte(FLAGS_FRAGMENT) >> 5;
        (flags & 0b010 != 0, flags & 0b001 != 0)
    }

    fn header(&self) -> &[u8] {
        &self.data[self.layer3_offset..self.payload_offset]
    }

    /// A header whose checksum field is correct sums to zero.
    pub fn validate_checksum(&self) -> bool {
        internet_checksum(self.header()) == 0
    }

    /// The checksum the current header should carry, ignoring whatever is in the field now.
    pub fn calculate_checksum(&self) -> u16 {
        let mut header = self.header().to_vec();
        write_u16(&mut header, CHECKSUM, 0);
        internet_checksum(&header)
    }

    pub fn set_checksum(&mut self) {
        let checksum = self.calculate_checksum();
        write_u16(&mut self.data, self.layer3_offset + CHECKSUM, checksum);
    }

    /// Length of the IPv4 packet itself, excluding any link layer header in front of it.
    pub fn len(&self) -> usize {
        self.data.len() - self.layer3_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Equality ignores whatever link layer bytes sit in front of the IPv4 header.
impl PartialEq for Ipv4Packet {
    fn eq(&self, other: &Self) -> bool {
        let ours = &self.data[self.layer3_offset..];
        ours == &other.data[other.layer3_offset..]
    }
}

impl Eq for Ipv4Packet {}

impl TryFrom<EthernetFrame> for Ipv4Packet {
    type Error = &'static str;

    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        match frame.ether_type() {
            IPV4_ETHER_TYPE => Ipv4Packet::from_buffer(frame.data, frame.payload_offset),
            _ => Err("Not an IPv4 frame"),
        }
    }
}

impl TryFrom<UdpSegment> for Ipv4Packet {
    type Error = &'static str;

    fn try_from(segment: UdpSegment) -> Result<Self, Self::Error> {
        match segment.layer3_offset {
            Some(offset) => Ipv4Packet::from_buffer(segment.data, offset),
            None => Err("UDP segment was built without an IPv4 header"),
        }
    }
}
