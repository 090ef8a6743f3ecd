mod config;
mod pcap_link;
mod serial;

use crate::config::HostConfig;
use crate::pcap_link::{PcapLink, PcapReceiver};
use crate::serial::TtySerial;
use crossbeam::atomic::AtomicCell;
use failure::{format_err, Error};
use log::{info, warn};
use slipbridge_runtime::{LinkBridge, SystemClock};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime;
use tokio::task;
use tokio::time;

type HostBridge = LinkBridge<PcapLink, TtySerial, SystemClock>;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = config::app().get_matches();
    let config = HostConfig::from_matches(&matches)?;

    let serial = TtySerial::open(&config.serial_path, config.baud)?;
    let (link, receiver) = pcap_link::open(&config.interface, config.bridge.mac)?;

    let bridge = Arc::new(LinkBridge::new(
        config.bridge.clone(),
        Arc::new(link),
        serial,
        Arc::new(SystemClock::new()),
    ));
    bridge.init();
    info!(
        "Bridging {} at {} baud onto {}",
        config.serial_path.display(),
        config.baud,
        config.interface
    );

    if let Some(hostname) = &config.dhcp_hostname {
        if let Err(err) = bridge.send_dhcp_discover(hostname) {
            warn!("DHCP discover not sent: {}", err);
        }
    }
    if let Some(sink) = config.announce {
        let message = format!("slipbridge up at {}", config.bridge.ip);
        if let Err(err) = bridge.send_debug(sink, &message) {
            warn!("Announcement not sent: {}", err);
        }
    }

    let mut runtime = runtime::Builder::new()
        .threaded_scheduler()
        .enable_all()
        .build()?;

    runtime.block_on(run(bridge, receiver, config))
}

async fn run(
    bridge: Arc<HostBridge>,
    receiver: PcapReceiver,
    config: HostConfig,
) -> Result<(), Error> {
    let running = Arc::new(AtomicCell::new(true));

    let capture = {
        let bridge = Arc::clone(&bridge);
        let running = Arc::clone(&running);
        task::spawn_blocking(move || {
            receiver.run(&running, |frame| bridge.on_frame_received(frame))
        })
    };

    let driver = tokio::spawn(drive(Arc::clone(&bridge), config, Arc::clone(&running)));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    running.store(false);

    driver
        .await
        .map_err(|err| format_err!("tick loop failed: {}", err))?;
    capture
        .await
        .map_err(|err| format_err!("capture loop failed: {}", err))??;

    info!("{}", bridge.stats());
    Ok(())
}

/// Ticks the bridge until `running` goes false, logging counters every stats interval.
async fn drive(bridge: Arc<HostBridge>, config: HostConfig, running: Arc<AtomicCell<bool>>) {
    let mut ticks = time::interval(config.tick_interval);
    let mut last_report = Instant::now();

    while running.load() {
        ticks.tick().await;
        // A tick may wait out an ARP resolution
        task::block_in_place(|| bridge.tick());

        if last_report.elapsed() >= config.stats_interval {
            info!("{}", bridge.stats());
            last_report = Instant::now();
        }
    }
}
