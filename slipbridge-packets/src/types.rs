use std::fmt;

pub type PacketData = Vec<u8>;

pub const IPV4_ETHER_TYPE: u16 = 0x0800;
pub const ARP_ETHER_TYPE: u16 = 0x0806;
/// Ether type used by the bridge for raw debug text frames.
pub const DEBUG_ETHER_TYPE: u16 = 0xBEEF;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const IPV4_HEADER_LEN: usize = 20;
pub const UDP_HEADER_LEN: usize = 8;

// Most significant byte is 0th
#[derive(Eq, Clone, Copy, Hash, PartialEq, Default)]
pub struct MacAddr {
    pub bytes: [u8; 6],
}

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr { bytes: [0xff; 6] };
    pub const ZERO: MacAddr = MacAddr { bytes: [0; 6] };

    pub fn new(bytes: [u8; 6]) -> MacAddr {
        MacAddr { bytes }
    }

    /// Builds an address from the first six bytes of `bytes`, if there are that many.
    pub fn from_slice(bytes: &[u8]) -> Option<MacAddr> {
        if bytes.len() < 6 {
            return None;
        }
        let mut mac = [0; 6];
        mac.copy_from_slice(&bytes[..6]);
        Some(MacAddr::new(mac))
    }

    pub fn is_broadcast(&self) -> bool {
        *self == MacAddr::BROADCAST
    }

    pub fn is_zero(&self) -> bool {
        *self == MacAddr::ZERO
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

impl std::str::FromStr for MacAddr {
    type Err = &'static str;

    /// Parses `aa:bb:cc:dd:ee:ff` (or `-` separated) notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut count = 0;
        for part in s.trim().split(|c| c == ':' || c == '-') {
            if count == 6 {
                return Err("MAC address has more than 6 octets");
            }
            if part.len() != 2 {
                return Err("MAC address octets must be two hex digits");
            }
            bytes[count] =
                u8::from_str_radix(part, 16).map_err(|_| "MAC address octet is not hex")?;
            count += 1;
        }
        if count != 6 {
            return Err("MAC address has fewer than 6 octets");
        }
        Ok(MacAddr::new(bytes))
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum IpProtocol {
    ICMP,
    TCP,
    UDP,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(num: u8) -> Self {
        match num {
            1 => IpProtocol::ICMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            other => IpProtocol::Other(other),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(protocol: IpProtocol) -> Self {
        match protocol {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::Other(other) => other,
        }
    }
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// RFC 1071 internet checksum over `data`, treating an odd trailing byte as padded with zero.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum = data.chunks(2).fold(0u32, |acc, word| {
        let hi = u32::from(word[0]) << 8;
        let lo = word.get(1).copied().map(u32::from).unwrap_or(0);
        acc + (hi | lo)
    });
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
