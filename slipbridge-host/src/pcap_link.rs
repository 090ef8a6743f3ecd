use crossbeam::atomic::AtomicCell;
use log::{debug, info};
use pcap::{Active, Capture};
use slipbridge_packets::MacAddr;
use slipbridge_runtime::{LinkError, LinkLayer};
use std::sync::{Mutex, PoisonError};

/// Read timeout of the receive capture, bounding how long shutdown waits on a quiet link.
const READ_TIMEOUT_MS: i32 = 100;
const SNAPLEN: i32 = 65535;

/// Transmit half of a pcap handle on the bridged interface.
pub struct PcapLink {
    capture: Mutex<Capture<Active>>,
}

/// Receive half. Runs on its own blocking thread and hands every frame not sent by us to the
/// callback.
pub struct PcapReceiver {
    capture: Capture<Active>,
    own_mac: MacAddr,
}

/// Opens two captures on `interface`, one to send on and one to read from.
pub fn open(interface: &str, own_mac: MacAddr) -> Result<(PcapLink, PcapReceiver), pcap::Error> {
    let tx = Capture::from_device(interface)?.snaplen(SNAPLEN).open()?;
    let rx = Capture::from_device(interface)?
        .promisc(true)
        .snaplen(SNAPLEN)
        .timeout(READ_TIMEOUT_MS)
        .open()?;
    info!("Opened {} for capture", interface);
    Ok((
        PcapLink {
            capture: Mutex::new(tx),
        },
        PcapReceiver {
            capture: rx,
            own_mac,
        },
    ))
}

impl LinkLayer for PcapLink {
    fn send_frame(&self, frame: &[u8]) -> Result<(), LinkError> {
        self.capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sendpacket(frame)
            .map_err(|err| LinkError::new(err.to_string()))
    }
}

impl PcapReceiver {
    /// Reads until `running` goes false or the capture fails.
    pub fn run<F>(mut self, running: &AtomicCell<bool>, mut on_frame: F) -> Result<(), pcap::Error>
    where
        F: FnMut(&[u8]),
    {
        while running.load() {
            match self.capture.next() {
                Ok(packet) => {
                    if is_from(packet.data, self.own_mac) {
                        continue;
                    }
                    on_frame(packet.data);
                }
                Err(pcap::Error::TimeoutExpired) => {}
                Err(err) => return Err(err),
            }
        }
        debug!("Capture loop stopped");
        Ok(())
    }
}

/// Whether `frame` carries `mac` as its source, i.e. pcap is showing us our own transmit.
fn is_from(frame: &[u8], mac: MacAddr) -> bool {
    frame.len() >= 12 && frame[6..12] == mac.bytes
}
