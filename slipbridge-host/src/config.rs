use clap::{App, Arg, ArgMatches};
use failure::{format_err, Error};
use slipbridge_packets::MacAddr;
use slipbridge_runtime::debug::DebugSink;
use slipbridge_runtime::BridgeConfig;
use std::fmt::Display;
use std::fs;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Everything the host needs to start a session.
#[derive(Clone, Debug)]
pub struct HostConfig {
    pub interface: String,
    pub serial_path: PathBuf,
    pub baud: u32,
    pub bridge: BridgeConfig,
    pub tick_interval: Duration,
    pub stats_interval: Duration,
    /// Send a DHCPDISCOVER with this host name at start up.
    pub dhcp_hostname: Option<String>,
    pub announce: Option<DebugSink>,
}

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("slipbridge")
        .version("0.1")
        .author("Slipbridge Contributors")
        .about("Bridge IPv4 between a SLIP serial line and an Ethernet or WiFi interface")
        .arg(
            Arg::with_name("interface")
                .short("i")
                .long("interface")
                .value_name("IFACE")
                .help("Network interface to bridge onto")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("serial")
                .short("s")
                .long("serial")
                .value_name("TTY")
                .help("Serial device carrying SLIP")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("baud")
                .short("b")
                .long("baud")
                .value_name("RATE")
                .default_value("115200")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("ip")
                .long("ip")
                .value_name("ADDR")
                .help("Our IPv4 address")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("netmask")
                .long("netmask")
                .value_name("MASK")
                .default_value("255.255.255.0")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("gateway")
                .long("gateway")
                .value_name("ADDR")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("mac")
                .long("mac")
                .value_name("MAC")
                .help("Our MAC address, read from the interface when not given")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tick_ms")
                .long("tick-ms")
                .value_name("MS")
                .default_value("1")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("arp_timeout_ms")
                .long("arp-timeout-ms")
                .value_name("MS")
                .default_value("250")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("arp_table_capacity")
                .long("arp-entries")
                .value_name("COUNT")
                .default_value("10")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("arp_flush_secs")
                .long("arp-flush-secs")
                .value_name("SECS")
                .default_value("300")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("stats_secs")
                .long("stats-secs")
                .value_name("SECS")
                .help("How often to log counters")
                .default_value("60")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("dhcp_hostname")
                .long("dhcp-discover")
                .value_name("HOSTNAME")
                .help("Broadcast a DHCPDISCOVER at start up")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("announce")
                .long("announce")
                .value_name("SINK")
                .help("Send a debug message when the bridge comes up")
                .possible_values(&["ether", "udp"])
                .takes_value(true),
        )
}

impl HostConfig {
    pub fn from_matches(matches: &ArgMatches) -> Result<HostConfig, Error> {
        let interface = required(matches, "interface")?.to_string();

        let mac = match matches.value_of("mac") {
            Some(mac) => parse_value::<MacAddr>("mac", mac)?,
            None => interface_mac(&interface)?,
        };

        let bridge = BridgeConfig::new(
            mac,
            parse_arg(matches, "ip")?,
            parse_arg(matches, "netmask")?,
            parse_arg(matches, "gateway")?,
        )
        .arp_timeout(Duration::from_millis(parse_arg(matches, "arp_timeout_ms")?))
        .arp_table_capacity(parse_arg(matches, "arp_table_capacity")?)
        .arp_flush_interval(Duration::from_secs(parse_arg(matches, "arp_flush_secs")?));

        let announce = match matches.value_of("announce") {
            Some("ether") => Some(DebugSink::EtherFrame),
            Some("udp") => Some(DebugSink::Udp),
            Some(other) => return Err(format_err!("unknown debug sink {}", other)),
            None => None,
        };

        Ok(HostConfig {
            interface,
            serial_path: PathBuf::from(required(matches, "serial")?),
            baud: parse_arg(matches, "baud")?,
            bridge,
            tick_interval: Duration::from_millis(parse_arg::<u64>(matches, "tick_ms")?.max(1)),
            stats_interval: Duration::from_secs(parse_arg(matches, "stats_secs")?),
            dhcp_hostname: matches.value_of("dhcp_hostname").map(str::to_string),
            announce,
        })
    }
}

/// Reads the MAC of `interface` from sysfs.
pub fn interface_mac(interface: &str) -> Result<MacAddr, Error> {
    let path = format!("/sys/class/net/{}/address", interface);
    let contents = fs::read_to_string(&path)
        .map_err(|err| format_err!("cannot read MAC of {} from {}: {}", interface, path, err))?;
    parse_value("mac", &contents)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, Error> {
    matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing --{}", name))
}

fn parse_arg<T>(matches: &ArgMatches, name: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(name, required(matches, name)?)
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| format_err!("invalid {} {:?}: {}", name, value, err))
}
