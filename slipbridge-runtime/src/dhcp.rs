//! Just enough DHCP to announce ourselves: a DHCPDISCOVER sent through the UDP builder.
//! Offers are not processed.

use slipbridge_packets::MacAddr;

pub const DHCP_SERVER_PORT: u16 = 67;
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const BOOTREQUEST: u8 = 1;
const HTYPE_ETHERNET: u8 = 1;
/// op through file, everything before the magic cookie.
const BOOTP_FIXED_LEN: usize = 236;
const CHADDR_OFFSET: usize = 28;

const OPTION_HOST_NAME: u8 = 12;
const OPTION_MESSAGE_TYPE: u8 = 53;
const OPTION_END: u8 = 255;

const DHCPDISCOVER: u8 = 1;

/// BOOTP/DHCP payload of a DHCPDISCOVER from `mac`. Host names longer than an option can
/// carry are cut at 255 bytes.
pub fn discover(mac: MacAddr, xid: u32, hostname: &str) -> Vec<u8> {
    let hostname = &hostname.as_bytes()[..hostname.len().min(255)];

    let mut payload = vec![0; BOOTP_FIXED_LEN];
    payload[0] = BOOTREQUEST;
    payload[1] = HTYPE_ETHERNET;
    payload[2] = mac.bytes.len() as u8;
    payload[4..8].copy_from_slice(&xid.to_be_bytes());
    payload[CHADDR_OFFSET..CHADDR_OFFSET + 6].copy_from_slice(&mac.bytes);

    payload.extend_from_slice(&DHCP_MAGIC_COOKIE);
    payload.extend_from_slice(&[OPTION_MESSAGE_TYPE, 1, DHCPDISCOVER]);
    payload.extend_from_slice(&[OPTION_HOST_NAME, hostname.len() as u8]);
    payload.extend_from_slice(hostname);
    payload.push(OPTION_END);
    payload
}
