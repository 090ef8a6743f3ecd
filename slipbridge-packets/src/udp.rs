use crate::*;
use std::borrow::Cow;
use std::convert::TryFrom;

const SRC_PORT: usize = 0;
const DEST_PORT: usize = 2;
const LENGTH: usize = 4;
const CHECKSUM: usize = 6;

/// A UDP header and payload at `layer4_offset`, optionally preceded by the IPv4 header at
/// `layer3_offset` it arrived in.
#[derive(Clone, Debug)]
pub struct UdpSegment {
    pub data: PacketData,
    pub layer3_offset: Option<usize>,
    pub layer4_offset: usize,
    pub payload_offset: usize,
}

impl UdpSegment {
    pub fn from_buffer(
        data: PacketData,
        layer3_offset: Option<usize>,
        layer4_offset: usize,
    ) -> Result<UdpSegment, &'static str> {
        let available = data.len().saturating_sub(layer4_offset);
        if available < UDP_HEADER_LEN {
            return Err("Buffer ends before a full UDP header");
        }

        let carried_by_udp = layer3_offset
            .map(|l3| IpProtocol::from(data[l3 + 9]) == IpProtocol::UDP)
            .unwrap_or(true);
        if !carried_by_udp {
            return Err("IPv4 protocol field is not UDP");
        }

        let length = usize::from(read_u16(&data, layer4_offset + LENGTH));
        if !(UDP_HEADER_LEN..=available).contains(&length) {
            return Err("UDP length field disagrees with the buffer");
        }

        Ok(UdpSegment {
            data,
            layer3_offset,
            layer4_offset,
            payload_offset: layer4_offset + UDP_HEADER_LEN,
        })
    }

    /// A bare header with zero ports, no payload and no IPv4 header in front.
    pub fn empty() -> UdpSegment {
        let mut segment = UdpSegment {
            data: vec![0; UDP_HEADER_LEN],
            layer3_offset: None,
            layer4_offset: 0,
            payload_offset: UDP_HEADER_LEN,
        };
        segment.write_field(LENGTH, UDP_HEADER_LEN as u16);
        segment
    }

    fn field(&self, field: usize) -> u16 {
        read_u16(&self.data, self.layer4_offset + field)
    }

    fn write_field(&mut self, field: usize, value: u16) -> &mut Self {
        write_u16(&mut self.data, self.layer4_offset + field, value);
        self
    }

    pub fn src_port(&self) -> u16 {
        self.field(SRC_PORT)
    }

    pub fn set_src_port(&mut self, port: u16) -> &mut Self {
        self.write_field(SRC_PORT, port)
    }

    pub fn dest_port(&self) -> u16 {
        self.field(DEST_PORT)
    }

    pub fn set_dest_port(&mut self, port: u16) -> &mut Self {
        self.write_field(DEST_PORT, port)
    }

    /// Header plus payload, as carried in the length field.
    pub fn length(&self) -> u16 {
        self.field(LENGTH)
    }

    pub fn checksum(&self) -> u16 {
        self.field(CHECKSUM)
    }

    /// Zero means "no checksum" for UDP over IPv4, which is what the bridge sends.
    pub fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.write_field(CHECKSUM, checksum)
    }

    pub fn payload(&self) -> Cow<[u8]> {
        let end = self.layer4_offset + usize::from(self.length());
        Cow::from(&self.data[self.payload_offset..end])
    }

    /// Replaces the payload and the length field. Neither the checksum nor an enclosing IPv4
    /// header is touched. Callers keep header plus payload within the 16 bit length field.
    pub fn set_payload(&mut self, payload: &[u8]) -> &mut Self {
        self.data.truncate(self.payload_offset);
        self.data.extend_from_slice(payload);
        self.write_field(LENGTH, (UDP_HEADER_LEN + payload.len()) as u16)
    }
}

/// Equality looks at the UDP header and payload only.
impl PartialEq for UdpSegment {
    fn eq(&self, other: &Self) -> bool {
        let ours = &self.data[self.layer4_offset..];
        ours == &other.data[other.layer4_offset..]
    }
}

impl Eq for UdpSegment {}

impl TryFrom<Ipv4Packet> for UdpSegment {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        UdpSegment::from_buffer(
            packet.data,
            Some(packet.layer3_offset),
            packet.payload_offset,
        )
    }
}
