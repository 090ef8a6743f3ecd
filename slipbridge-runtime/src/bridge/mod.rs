//! The bridge between the WiFi link and the serial line.

use crate::arp::{AddressTable, ArpGenerator, ArpHandler, ArpResolver};
use crate::codec::{encode, SlipDecoder};
use crate::config::BridgeConfig;
use crate::debug::{debug_frame, nul_terminated, DebugSink, DEBUG_UDP_PORT};
use crate::dhcp;
use crate::error::{BridgeError, Result};
use crate::link::{Clock, LinkLayer, SerialPort};
use crate::stats::{BridgeStats, StatsSnapshot};
use crate::utils::lock;
use crossbeam::atomic::AtomicCell;
use log::{debug, info, trace, warn};
use slipbridge_packets::*;
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

mod routing;
pub use self::routing::*;

mod tx_slot;
pub use self::tx_slot::*;

/// Bytes pulled from the serial port per read.
const SERIAL_READ_CHUNK: usize = 64;

/// Source port of a datagram sent to `dest_port`.
pub fn udp_source_port(dest_port: u16) -> u16 {
    dest_port.wrapping_sub(11)
}

struct SerialState<S: SerialPort> {
    port: S,
    decoder: SlipDecoder,
    read_buf: Vec<u8>,
}

/// LinkBridge
///
/// Owns the address table, the serial decoder and the single slot serial transmit queue for
/// one running session. It has two entry surfaces that may be driven from different threads:
///
/// - `tick`, called by the driver loop, drains the serial port, bridges every packet it
///   recovers onto the WiFi link, writes out any queued serial packet and ages the table.
/// - `on_frame_received`, called by the WiFi driver for every frame, learns from ARP,
///   answers ARP requests for our address and queues IPv4 packets for us onto the serial
///   line.
///
/// Only `tick` touches the serial port. The receive path never blocks; if the transmit slot
/// is taken the packet is dropped and counted.
pub struct LinkBridge<L: LinkLayer, S: SerialPort, C: Clock> {
    config: BridgeConfig,
    link: Arc<L>,
    clock: Arc<C>,
    table: Arc<Mutex<AddressTable>>,
    handler: ArpHandler<C>,
    resolver: ArpResolver<L, C>,
    serial: Mutex<SerialState<S>>,
    tx_slot: PendingTxSlot,
    next_flush: AtomicCell<u64>,
    stats: Arc<BridgeStats>,
}

impl<L: LinkLayer, S: SerialPort, C: Clock> LinkBridge<L, S, C> {
    pub fn new(config: BridgeConfig, link: Arc<L>, serial: S, clock: Arc<C>) -> Self {
        let table = Arc::new(Mutex::new(AddressTable::new(config.arp_table_capacity)));
        let stats = Arc::new(BridgeStats::new());
        let generator = ArpGenerator::new(config.mac, config.ip);

        let handler = ArpHandler::new(
            config.ip,
            Arc::clone(&table),
            generator.clone(),
            Arc::clone(&clock),
        );
        let resolver = ArpResolver::new(
            Arc::clone(&table),
            generator,
            Arc::clone(&link),
            Arc::clone(&clock),
            Arc::clone(&stats),
        )
        .timeout(config.arp_timeout)
        .poll_interval(config.arp_poll_interval);

        let serial = SerialState {
            port: serial,
            decoder: SlipDecoder::new(config.max_frame_len),
            read_buf: vec![0; SERIAL_READ_CHUNK],
        };

        LinkBridge {
            tx_slot: PendingTxSlot::new(config.max_frame_len),
            config,
            link,
            clock,
            table,
            handler,
            resolver,
            serial: Mutex::new(serial),
            next_flush: AtomicCell::new(0),
            stats,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Resets the session: empties the address table, pins our own binding, drops any
    /// partial serial frame and schedules the next table flush.
    pub fn init(&self) {
        self.reset_table();
        lock(&self.serial).decoder.reset();
        self.next_flush
            .store(self.clock.now_ms() + self.flush_interval_ms());
        info!(
            "Bridge up as {} ({}) netmask {} gateway {}",
            self.config.ip, self.config.mac, self.config.netmask, self.config.gateway
        );
    }

    /// One driver iteration: serial receive first, then the serial transmit slot, then
    /// table aging. Errors are counted and logged, never returned.
    pub fn tick(&self) {
        let mut serial = lock(&self.serial);

        for packet in self.read_serial(&mut serial) {
            self.stats.serial_packet_in();
            if let Err(err) = self.bridge_ip_packet(&packet) {
                match err {
                    // The resolver has already logged it
                    BridgeError::NoRoute { .. } => {}
                    err => warn!("Dropped serial packet: {}", err),
                }
            }
        }

        self.flush_tx(&mut serial.port);
        drop(serial);

        self.age_table();
    }

    /// Entry point for the WiFi driver. Never blocks and never fails; problems are counted
    /// and logged.
    pub fn on_frame_received(&self, bytes: &[u8]) {
        self.stats.frame_received();
        let frame = match EthernetFrame::from_buffer(bytes.to_vec()) {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.malformed();
                debug!("Dropped inbound frame: {}", err);
                return;
            }
        };
        match self.on_ethernet_frame(frame) {
            Ok(()) => {}
            Err(BridgeError::Malformed(err)) => debug!("Dropped inbound frame: {}", err),
            Err(err) => warn!("Inbound frame: {}", err),
        }
    }

    /// Dispatches an inbound frame on its ether type. ARP goes to the ARP handler and any
    /// reply is sent straight away. IPv4 addressed to us is queued for the serial line.
    /// Everything else is dropped.
    pub fn on_ethernet_frame(&self, frame: EthernetFrame) -> Result<()> {
        match frame.ether_type() {
            ARP_ETHER_TYPE => {
                let arp_frame = ArpFrame::try_from(frame).map_err(|err| self.malformed(err))?;
                if let Some(reply) = self.handler.handle(&arp_frame) {
                    self.transmit(reply.ethernet().as_ref())?;
                    self.stats.arp_reply_sent();
                }
                Ok(())
            }
            IPV4_ETHER_TYPE => {
                let packet = Ipv4Packet::try_from(frame).map_err(|err| self.malformed(err))?;
                if packet.dest_addr() == self.config.ip {
                    let start = packet.layer3_offset;
                    let end = start + packet.total_len() as usize;
                    self.offer_to_serial(&packet.data[start..end])
                } else {
                    trace_foreign_ipv4(packet);
                    Ok(())
                }
            }
            other => {
                trace!("Dropped frame with ether type {:#06x}", other);
                Ok(())
            }
        }
    }

    /// Puts `packet` in the serial transmit slot for the next tick. Returns false, counting
    /// and logging a drop, when the slot is taken or the packet does not fit.
    pub fn queue_for_serial(&self, packet: &[u8]) -> bool {
        match self.offer_to_serial(packet) {
            Ok(()) => true,
            Err(err) => {
                warn!("Dropping {} byte packet for serial: {}", packet.len(), err);
                false
            }
        }
    }

    /// Counts a refused offer under its real cause and hands that cause back.
    fn offer_to_serial(&self, packet: &[u8]) -> Result<()> {
        self.tx_slot.offer(packet).map_err(|err| {
            match err {
                BridgeError::TxBusy => self.stats.tx_busy(packet.len()),
                _ => self.stats.overrun(),
            }
            err
        })
    }

    pub fn is_tx_pending(&self) -> bool {
        self.tx_slot.is_occupied()
    }

    /// Whether `ip` shares our network prefix.
    pub fn same_subnet(&self, ip: Ipv4Addr) -> bool {
        same_subnet(ip, self.config.ip, self.config.netmask)
    }

    /// Whether `ip` is a broadcast address under our netmask.
    pub fn is_broadcast(&self, ip: Ipv4Addr) -> bool {
        is_subnet_broadcast(ip, self.config.netmask)
    }

    /// Picks the destination MAC for `dest`. The limited broadcast and our own subnet's
    /// broadcast need no resolution. Other hosts on our subnet are resolved directly, anything
    /// else through the gateway. May block for up to the ARP timeout.
    pub fn route(&self, dest: Ipv4Addr) -> Result<MacAddr> {
        let on_subnet = self.same_subnet(dest);
        if dest == Ipv4Addr::BROADCAST || (on_subnet && self.is_broadcast(dest)) {
            return Ok(MacAddr::BROADCAST);
        }
        let next_hop = if on_subnet { dest } else { self.config.gateway };
        self.resolver.resolve_blocking(next_hop)
    }

    /// Wraps `payload` in UDP, IPv4 and Ethernet headers addressed to `dest:dest_port`.
    ///
    /// The source port is `dest_port - 11`, the UDP checksum is left at zero and the IPv4
    /// identification is the low 16 bits of the clock. Payloads whose IPv4 total length would
    /// not fit its 16 bit field are refused whatever the transmit buffer size.
    pub fn build_udp_datagram(
        &self,
        src: Ipv4Addr,
        dest: Ipv4Addr,
        dest_port: u16,
        payload: &[u8],
    ) -> Result<EthernetFrame> {
        let ip_len = IPV4_HEADER_LEN + UDP_HEADER_LEN + payload.len();
        if ip_len > usize::from(u16::MAX) {
            self.stats.overrun();
            return Err(BridgeError::BufferOverrun {
                len: ip_len,
                capacity: usize::from(u16::MAX),
            });
        }
        self.check_frame_len(ETHERNET_HEADER_LEN + ip_len)?;

        let dest_mac = self.route(dest)?;

        let mut segment = UdpSegment::empty();
        segment
            .set_src_port(udp_source_port(dest_port))
            .set_dest_port(dest_port)
            .set_checksum(0)
            .set_payload(payload);

        let identification = (self.clock.now_ms() & 0xFFFF) as u16;
        let packet = Ipv4Packet::encap_udp(&segment, src, dest, identification);
        Ok(EthernetFrame::encap_ipv4(&packet, dest_mac, self.config.mac))
    }

    /// Builds a datagram with `build_udp_datagram` and transmits it.
    pub fn send_udp_datagram(
        &self,
        src: Ipv4Addr,
        dest: Ipv4Addr,
        dest_port: u16,
        payload: &[u8],
    ) -> Result<()> {
        let frame = self.build_udp_datagram(src, dest, dest_port, payload)?;
        self.transmit(frame.as_ref())
    }

    /// Sends a raw IPv4 packet recovered from the serial line out on WiFi, resolving the next
    /// hop first. Packets that would not fit the transmit buffer are rejected before any
    /// resolution traffic.
    pub fn bridge_ip_packet(&self, raw_packet: &[u8]) -> Result<()> {
        self.check_frame_len(ETHERNET_HEADER_LEN + raw_packet.len())?;

        let packet = Ipv4Packet::from_buffer(raw_packet.to_vec(), 0)
            .map_err(|err| self.malformed(err))?;
        let dest_mac = self.route(packet.dest_addr())?;

        let frame = EthernetFrame::encap_ipv4(&packet, dest_mac, self.config.mac);
        self.transmit(frame.as_ref())?;
        debug!(
            "Bridged {} bytes from serial to {} via {}",
            raw_packet.len(),
            packet.dest_addr(),
            dest_mac
        );
        Ok(())
    }

    /// Broadcasts a DHCPDISCOVER for our MAC, using the clock as transaction id.
    pub fn send_dhcp_discover(&self, hostname: &str) -> Result<()> {
        let payload = dhcp::discover(self.config.mac, self.clock.now_ms() as u32, hostname);
        self.send_udp_datagram(
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::BROADCAST,
            dhcp::DHCP_SERVER_PORT,
            &payload,
        )
    }

    /// Sends `message` to a network debug listener. Messages too long for one frame are cut.
    pub fn send_debug(&self, sink: DebugSink, message: &str) -> Result<()> {
        match sink {
            DebugSink::EtherFrame => {
                let room = self.config.tx_buffer_len.saturating_sub(ETHERNET_HEADER_LEN);
                let frame = debug_frame(self.config.mac, &nul_terminated(message, room));
                self.transmit(frame.as_ref())
            }
            DebugSink::Udp => {
                let room = self.config.tx_buffer_len.saturating_sub(
                    ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN,
                );
                self.send_udp_datagram(
                    self.config.ip,
                    self.config.subnet_broadcast(),
                    DEBUG_UDP_PORT,
                    &nul_terminated(message, room),
                )
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// A copy of the address table.
    pub fn address_table(&self) -> AddressTable {
        lock(&self.table).clone()
    }

    /// Runs `f` with the address table locked. Keep it short, the receive path waits on it.
    pub fn with_address_table<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut AddressTable) -> R,
    {
        f(&mut lock(&self.table))
    }

    fn transmit(&self, frame: &[u8]) -> Result<()> {
        match self.link.send_frame(frame) {
            Ok(()) => {
                self.stats.frame_sent();
                Ok(())
            }
            Err(err) => {
                self.stats.link_error();
                Err(err.into())
            }
        }
    }

    fn check_frame_len(&self, len: usize) -> Result<()> {
        if len > self.config.tx_buffer_len {
            self.stats.overrun();
            return Err(BridgeError::BufferOverrun {
                len,
                capacity: self.config.tx_buffer_len,
            });
        }
        Ok(())
    }

    fn malformed(&self, err: &'static str) -> BridgeError {
        self.stats.malformed();
        BridgeError::Malformed(err)
    }

    /// Reads what the port had available when the tick started and returns the packets it
    /// completed.
    fn read_serial(&self, serial: &mut SerialState<S>) -> Vec<Vec<u8>> {
        let SerialState {
            port,
            decoder,
            read_buf,
        } = serial;

        let mut packets = Vec::new();
        let mut remaining = port.available();
        while remaining > 0 {
            let want = remaining.min(read_buf.len());
            let count = port.read(&mut read_buf[..want]);
            if count == 0 {
                break;
            }
            remaining = remaining.saturating_sub(count);

            let overruns = decoder.overruns();
            packets.extend(decoder.decode(&read_buf[..count]));
            for _ in overruns..decoder.overruns() {
                self.stats.overrun();
            }
        }
        packets
    }

    fn flush_tx(&self, port: &mut S) {
        if let Some(packet) = self.tx_slot.take() {
            let encoded = encode(&packet);
            port.write(&encoded);
            self.stats.serial_bytes_written(encoded.len());
            trace!("Wrote {} byte packet to serial", packet.len());
        }
    }

    fn age_table(&self) {
        let now = self.clock.now_ms();
        if now < self.next_flush.load() {
            return;
        }
        self.next_flush.store(now + self.flush_interval_ms());
        info!("Flushing ARP cache");
        self.reset_table();
    }

    fn reset_table(&self) {
        let mut table = lock(&self.table);
        debug!("{}", table);
        table.flush();
        table.insert_static(self.config.ip, self.config.mac);
    }

    fn flush_interval_ms(&self) -> u64 {
        self.config.arp_flush_interval.as_millis() as u64
    }
}

fn trace_foreign_ipv4(packet: Ipv4Packet) {
    let (src, dest, protocol) = (packet.src_addr(), packet.dest_addr(), packet.protocol());
    match UdpSegment::try_from(packet) {
        Ok(segment) => trace!(
            "Ignoring UDP {}:{} -> {}:{}",
            src,
            segment.src_port(),
            dest,
            segment.dest_port()
        ),
        Err(_) => trace!("Ignoring IPv4 {} -> {} ({:?})", src, dest, protocol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::END;
    use crate::utils::test::*;
    use std::time::Duration;

    const PEER_MAC: MacAddr = MacAddr {
        bytes: [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01],
    };
    const GATEWAY_MAC: MacAddr = MacAddr {
        bytes: [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xfe],
    };

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn learn(h: &Harness, mac: MacAddr, addr: Ipv4Addr) {
        h.bridge
            .with_address_table(|table| table.upsert(mac, addr, 0));
    }

    #[test]
    fn init_pins_own_binding() {
        let h = harness(test_config());
        let table = h.bridge.address_table();
        assert_eq!(table.len(), 1);
        assert!(table.find_by_ip(ip(9)).unwrap().is_static());
        assert_eq!(table.find_by_ip(ip(9)).unwrap().mac, TEST_MAC);
    }

    #[test]
    fn build_udp_datagram_for_learned_peer() {
        let h = harness(test_config());
        learn(&h, PEER_MAC, ip(5));

        let frame = h
            .bridge
            .build_udp_datagram(ip(9), ip(5), 7000, b"ping")
            .unwrap();
        assert_eq!(frame.dest_mac(), PEER_MAC);
        assert_eq!(frame.src_mac(), TEST_MAC);
        assert_eq!(frame.ether_type(), IPV4_ETHER_TYPE);

        let packet = Ipv4Packet::try_from(frame).unwrap();
        assert_eq!(packet.src_addr(), ip(9));
        assert_eq!(packet.dest_addr(), ip(5));
        assert_eq!(packet.ttl(), 127);
        assert_eq!(packet.protocol(), IpProtocol::UDP);
        assert!(packet.validate_checksum());

        let segment = UdpSegment::try_from(packet).unwrap();
        assert_eq!(segment.dest_port(), 7000);
        assert_eq!(segment.src_port(), 6989);
        assert_eq!(segment.checksum(), 0);
        assert_eq!(&segment.payload()[..], b"ping");
        // No resolution traffic was needed
        assert!(h.link.frames().is_empty());
    }

    #[test]
    fn off_subnet_goes_through_gateway() {
        let h = harness(test_config());
        learn(&h, GATEWAY_MAC, ip(1));
        let frame = h
            .bridge
            .build_udp_datagram(ip(9), Ipv4Addr::new(8, 8, 8, 8), 53, b"q")
            .unwrap();
        assert_eq!(frame.dest_mac(), GATEWAY_MAC);
        assert_eq!(
            Ipv4Packet::try_from(frame).unwrap().dest_addr(),
            Ipv4Addr::new(8, 8, 8, 8)
        );
    }

    #[test]
    fn broadcast_bypasses_resolution() {
        let h = harness(test_config());
        for &dest in [ip(255), Ipv4Addr::BROADCAST].iter() {
            assert_eq!(h.bridge.route(dest).unwrap(), MacAddr::BROADCAST);
        }
        assert!(h.link.frames().is_empty());
        assert_eq!(h.clock.now_ms(), 0);
        assert_eq!(h.bridge.stats().arp_requests_sent, 0);
    }

    #[test]
    fn all_ones_host_off_subnet_is_not_a_broadcast() {
        let h = harness(test_config());
        learn(&h, GATEWAY_MAC, ip(1));
        assert_eq!(
            h.bridge.route(Ipv4Addr::new(172, 16, 5, 255)).unwrap(),
            GATEWAY_MAC
        );
        assert!(h.link.frames().is_empty());
    }

    #[test]
    fn unresolved_route_times_out() {
        let h = harness(test_config());
        match h.bridge.send_udp_datagram(ip(9), ip(77), 7000, b"ping") {
            Err(BridgeError::NoRoute { ip: missing }) => assert_eq!(missing, ip(77)),
            other => panic!("expected NoRoute, got {:?}", other),
        }
        assert_eq!(h.clock.now_ms(), 250);
        // Only the ARP request went out
        assert_eq!(h.link.frames().len(), 1);
        assert_eq!(h.bridge.stats().resolution_timeouts, 1);
    }

    #[test]
    fn oversized_datagram_fails_before_resolving() {
        let h = harness(test_config().tx_buffer_len(100));
        let payload = [0u8; 59];
        match h.bridge.build_udp_datagram(ip(9), ip(77), 7000, &payload) {
            Err(BridgeError::BufferOverrun { len, capacity }) => {
                assert_eq!((len, capacity), (101, 100))
            }
            other => panic!("expected BufferOverrun, got {:?}", other),
        }
        assert!(h.link.frames().is_empty());
        assert_eq!(h.clock.now_ms(), 0);
    }

    #[test]
    fn datagram_beyond_ipv4_total_length_is_refused() {
        let h = harness(test_config().tx_buffer_len(200_000));
        learn(&h, PEER_MAC, ip(5));

        let payload = vec![0u8; 70_000];
        match h.bridge.build_udp_datagram(ip(9), ip(5), 7000, &payload) {
            Err(BridgeError::BufferOverrun { len, capacity }) => {
                assert_eq!((len, capacity), (70_028, 65_535))
            }
            other => panic!("expected BufferOverrun, got {:?}", other),
        }
        assert_eq!(h.bridge.stats().overruns, 1);

        let largest = vec![0u8; 65_535 - 28];
        let frame = h
            .bridge
            .build_udp_datagram(ip(9), ip(5), 7000, &largest)
            .unwrap();
        assert_eq!(frame.len(), ETHERNET_HEADER_LEN + 65_535);
        let packet = Ipv4Packet::try_from(frame).unwrap();
        assert_eq!(packet.total_len(), 65_535);
        assert_eq!(UdpSegment::try_from(packet).unwrap().payload().len(), largest.len());
    }

    #[test]
    fn bridge_ip_packet_encapsulates() {
        let h = harness(test_config());
        learn(&h, PEER_MAC, ip(5));
        let raw = udp_packet(ip(9), ip(5), 1000, 2000, b"data");

        h.bridge.bridge_ip_packet(&raw).unwrap();
        let frames = h.link.frames();
        assert_eq!(frames.len(), 1);
        let frame = EthernetFrame::from_buffer(frames[0].clone()).unwrap();
        assert_eq!(frame.dest_mac(), PEER_MAC);
        assert_eq!(frame.src_mac(), TEST_MAC);
        assert_eq!(&frame.payload()[..], &raw[..]);
        assert_eq!(h.bridge.stats().frames_sent, 1);
    }

    #[test]
    fn bridge_ip_packet_rejects_oversize_and_garbage() {
        let h = harness(test_config().tx_buffer_len(64));
        let raw = udp_packet(ip(9), ip(5), 1, 2, &[0; 40]);
        assert!(matches!(
            h.bridge.bridge_ip_packet(&raw),
            Err(BridgeError::BufferOverrun { .. })
        ));
        assert!(matches!(
            h.bridge.bridge_ip_packet(&[0x60, 0, 0, 0]),
            Err(BridgeError::Malformed(_))
        ));
        assert!(h.link.frames().is_empty());
        let stats = h.bridge.stats();
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn link_errors_are_passed_through() {
        let h = harness(test_config());
        learn(&h, PEER_MAC, ip(5));
        h.link.set_failing(true);
        assert!(matches!(
            h.bridge.send_udp_datagram(ip(9), ip(5), 7000, b"x"),
            Err(BridgeError::Link(_))
        ));
        assert_eq!(h.bridge.stats().link_errors, 1);
    }

    #[test]
    fn arp_request_for_us_is_answered() {
        let h = harness(test_config());
        h.bridge.on_frame_received(&arp_frame(
            ArpOp::Request,
            (PEER_MAC, ip(5)),
            (MacAddr::ZERO, ip(9)),
        ));

        let frames = h.link.frames();
        assert_eq!(frames.len(), 1);
        let reply =
            ArpFrame::try_from(EthernetFrame::from_buffer(frames[0].clone()).unwrap()).unwrap();
        assert_eq!(reply.opcode(), ArpOp::Reply as u16);
        assert_eq!(reply.sender_mac_addr(), Some(TEST_MAC));
        assert_eq!(reply.target_mac_addr(), Some(PEER_MAC));
        assert_eq!(reply.ethernet().dest_mac(), MacAddr::BROADCAST);

        assert_eq!(
            h.bridge.address_table().find_by_ip(ip(5)).unwrap().mac,
            PEER_MAC
        );
        assert_eq!(h.bridge.stats().arp_replies_sent, 1);
    }

    #[test]
    fn ipv4_for_us_is_queued_then_written_on_tick() {
        let h = harness(test_config());
        let frame = udp_frame(TEST_MAC, PEER_MAC, ip(5), ip(9), &[1, END, 2]);
        h.bridge.on_frame_received(&frame);
        assert!(h.bridge.is_tx_pending());
        assert!(h.serial.written().is_empty());

        h.bridge.tick();
        assert!(!h.bridge.is_tx_pending());
        let written = h.serial.take_written();
        let mut decoder = SlipDecoder::default();
        let packets = decoder.decode(&written);
        assert_eq!(packets, vec![frame[ETHERNET_HEADER_LEN..].to_vec()]);
        assert_eq!(h.bridge.stats().serial_bytes_out, written.len() as u64);
    }

    #[test]
    fn ethernet_padding_is_not_sent_to_serial() {
        let h = harness(test_config());
        let mut frame = udp_frame(TEST_MAC, PEER_MAC, ip(5), ip(9), b"");
        let ip_len = frame.len() - ETHERNET_HEADER_LEN;
        frame.resize(60, 0);
        h.bridge.on_frame_received(&frame);
        h.bridge.tick();

        let packets = SlipDecoder::default().decode(&h.serial.written());
        assert_eq!(packets[0].len(), ip_len);
    }

    #[test]
    fn second_inbound_packet_is_dropped_while_slot_is_full() {
        let h = harness(test_config());
        let first = udp_frame(TEST_MAC, PEER_MAC, ip(5), ip(9), b"first");
        let second = udp_frame(TEST_MAC, PEER_MAC, ip(5), ip(9), b"second");
        h.bridge.on_frame_received(&first);
        h.bridge.on_frame_received(&second);

        let stats = h.bridge.stats();
        assert_eq!(stats.tx_busy_drops, 1);
        assert_eq!(
            stats.tx_bytes_dropped,
            (second.len() - ETHERNET_HEADER_LEN) as u64
        );

        h.bridge.tick();
        let packets = SlipDecoder::default().decode(&h.serial.written());
        assert_eq!(packets, vec![first[ETHERNET_HEADER_LEN..].to_vec()]);
    }

    #[test]
    fn inbound_packet_too_big_for_the_slot_is_an_overrun() {
        let h = harness(test_config().max_frame_len(16));
        let frame = udp_frame(TEST_MAC, PEER_MAC, ip(5), ip(9), b"too long");
        let frame = EthernetFrame::from_buffer(frame).unwrap();

        match h.bridge.on_ethernet_frame(frame) {
            Err(BridgeError::BufferOverrun { len, capacity }) => {
                assert_eq!((len, capacity), (36, 16))
            }
            other => panic!("expected BufferOverrun, got {:?}", other),
        }
        assert!(!h.bridge.is_tx_pending());
        let stats = h.bridge.stats();
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.tx_busy_drops, 0);
    }

    #[test]
    fn inbound_packet_while_slot_is_full_is_busy() {
        let h = harness(test_config());
        assert!(h.bridge.queue_for_serial(&[1, 2, 3]));
        let frame = udp_frame(TEST_MAC, PEER_MAC, ip(5), ip(9), b"late");
        let frame = EthernetFrame::from_buffer(frame).unwrap();
        assert!(matches!(
            h.bridge.on_ethernet_frame(frame),
            Err(BridgeError::TxBusy)
        ));
        assert_eq!(h.bridge.stats().overruns, 0);
    }

    #[test]
    fn queue_for_serial_keeps_first_packet() {
        let h = harness(test_config());
        assert!(h.bridge.queue_for_serial(&[1, 2, 3]));
        assert!(!h.bridge.queue_for_serial(&[4, 5]));
        h.bridge.tick();
        assert_eq!(h.serial.written(), encode(&[1, 2, 3]));
    }

    #[test]
    fn foreign_and_unknown_frames_are_dropped() {
        let h = harness(test_config());
        h.bridge
            .on_frame_received(&udp_frame(PEER_MAC, TEST_MAC, ip(9), ip(5), b"x"));
        let other = EthernetFrame::new(MacAddr::BROADCAST, PEER_MAC, 0x86DD);
        h.bridge.on_frame_received(other.as_ref());
        h.bridge.on_frame_received(&[1, 2, 3]);

        assert!(!h.bridge.is_tx_pending());
        let stats = h.bridge.stats();
        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn tick_bridges_serial_packets() {
        let h = harness(test_config());
        learn(&h, PEER_MAC, ip(5));
        let raw = udp_packet(ip(9), ip(5), 1000, 2000, &[END, 0xDB, 7]);
        h.serial.inject(&encode(&raw));

        h.bridge.tick();
        let frames = h.link.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][ETHERNET_HEADER_LEN..], &raw[..]);
        assert_eq!(h.bridge.stats().serial_packets_in, 1);
    }

    #[test]
    fn tick_counts_serial_overruns() {
        let h = harness(test_config().max_frame_len(8));
        h.serial.inject(&encode(&[0x45; 20]));
        h.bridge.tick();
        assert_eq!(h.bridge.stats().overruns, 1);
        assert!(h.link.frames().is_empty());
    }

    #[test]
    fn table_is_flushed_and_repinned_on_schedule() {
        let h = harness(test_config().arp_flush_interval(Duration::from_secs(300)));
        learn(&h, PEER_MAC, ip(5));

        h.clock.set(299_999);
        h.bridge.tick();
        assert_eq!(h.bridge.address_table().len(), 2);

        h.clock.set(300_000);
        h.bridge.tick();
        let table = h.bridge.address_table();
        assert_eq!(table.len(), 1);
        assert!(table.find_by_ip(ip(9)).unwrap().is_static());

        learn(&h, PEER_MAC, ip(5));
        h.clock.set(599_999);
        h.bridge.tick();
        assert_eq!(h.bridge.address_table().len(), 2);
    }

    #[test]
    fn dhcp_discover_is_broadcast() {
        let h = harness(test_config());
        h.clock.set(0x1234);
        h.bridge.send_dhcp_discover("bridge").unwrap();

        let frames = h.link.frames();
        assert_eq!(frames.len(), 1);
        let frame = EthernetFrame::from_buffer(frames[0].clone()).unwrap();
        assert_eq!(frame.dest_mac(), MacAddr::BROADCAST);
        let packet = Ipv4Packet::try_from(frame).unwrap();
        assert_eq!(packet.src_addr(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(packet.dest_addr(), Ipv4Addr::BROADCAST);
        assert_eq!(packet.identification(), 0x1234);
        let segment = UdpSegment::try_from(packet).unwrap();
        assert_eq!(segment.dest_port(), 67);
        assert_eq!(segment.src_port(), 56);
        assert_eq!(&segment.payload()[4..8], &[0, 0, 0x12, 0x34]);
    }

    #[test]
    fn debug_sinks() {
        let h = harness(test_config());
        h.bridge.send_debug(DebugSink::EtherFrame, "hello").unwrap();
        h.bridge.send_debug(DebugSink::Udp, "hello").unwrap();

        let frames = h.link.frames();
        let raw = EthernetFrame::from_buffer(frames[0].clone()).unwrap();
        assert_eq!(raw.ether_type(), DEBUG_ETHER_TYPE);
        assert_eq!(&raw.payload()[..], b"hello\0");

        let udp = EthernetFrame::from_buffer(frames[1].clone()).unwrap();
        assert_eq!(udp.dest_mac(), MacAddr::BROADCAST);
        let packet = Ipv4Packet::try_from(udp).unwrap();
        assert_eq!(packet.dest_addr(), ip(255));
        let segment = UdpSegment::try_from(packet).unwrap();
        assert_eq!(segment.dest_port(), DEBUG_UDP_PORT);
        assert_eq!(&segment.payload()[..], b"hello\0");
    }
}
