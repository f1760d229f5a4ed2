//! Voidlink Daemon - Corsair Void wireless headset service.
//!
//! Waits for the wireless receiver, binds it, and keeps the headset state
//! published until the receiver goes away or the daemon is asked to stop.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use voidlink_core::HeadsetEvent;
use voidlink_hid::{
    HidApiTransport, Headset, Presentation, Receiver, ReportTransport, TokioScheduler,
};

mod config;
mod presentation;
mod reader;
mod signals;
mod status;

use config::Config;
use presentation::{DaemonPresentation, SessionEvent};
use signals::ShutdownSignal;
use status::StatusWriter;

type BoundHeadset = Headset<HidApiTransport, DaemonPresentation>;

/// Why a receiver session ended.
enum SessionEnd {
    Shutdown,
    ReceiverLost,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config()?;

    // Initialize logging; RUST_LOG overrides the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.daemon.log_level)
            .with_context(|| format!("Invalid log level: {:?}", config.daemon.log_level))?,
    };
    if config.daemon.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Voidlink daemon");

    let (vendor_id, product_id) = config.device.usb_ids()?;
    let mut shutdown = ShutdownSignal::install()?;

    loop {
        let receiver = tokio::select! {
            receiver = wait_for_receiver(&config, vendor_id, product_id) => receiver,
            () = shutdown.recv() => break,
        };

        match run_session(&config, &receiver, &mut shutdown).await? {
            SessionEnd::Shutdown => break,
            SessionEnd::ReceiverLost => info!("Waiting for receiver to return"),
        }
    }

    info!("Voidlink daemon stopped");
    Ok(())
}

/// Poll USB until the receiver shows up.
async fn wait_for_receiver(config: &Config, vendor_id: u16, product_id: u16) -> Receiver {
    let mut announced = false;
    loop {
        match tokio::task::spawn_blocking(move || Receiver::detect(vendor_id, product_id)).await {
            Ok(Ok(Some(receiver))) => return receiver,
            Ok(Ok(None)) => {
                if !announced {
                    info!(
                        vendor_id = format!("{vendor_id:04x}"),
                        product_id = format!("{product_id:04x}"),
                        "Receiver not present, waiting"
                    );
                    announced = true;
                }
            }
            Ok(Err(e)) => warn!(error = %e, "USB scan failed"),
            Err(e) => warn!(error = %e, "USB scan task failed"),
        }
        sleep(config.device.rescan_interval()).await;
    }
}

/// Bind the receiver and serve it until it goes away or shutdown is requested.
async fn run_session(
    config: &Config,
    receiver: &Receiver,
    shutdown: &mut ShutdownSignal,
) -> Result<SessionEnd> {
    let (transport, report_reader) = match receiver.open(config.device.read_timeout_ms) {
        Ok(opened) => opened,
        Err(e) => {
            warn!(error = %e, "Failed to open receiver");
            let end = tokio::select! {
                () = sleep(config.device.rescan_interval()) => SessionEnd::ReceiverLost,
                () = shutdown.recv() => SessionEnd::Shutdown,
            };
            return Ok(end);
        }
    };
    info!(
        bus = receiver.bus(),
        address = receiver.address(),
        serial = receiver.serial(),
        "Receiver opened"
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let presentation = Arc::new(DaemonPresentation::new(receiver.serial(), event_tx.clone()));
    let scheduler = Arc::new(TokioScheduler::new(Handle::current()));
    let headset: Arc<BoundHeadset> =
        Arc::new(Headset::bind(Arc::new(transport), presentation, scheduler));
    let reader = reader::spawn(report_reader, Arc::clone(&headset), event_tx)?;

    let status = StatusWriter::new(config.status.file.clone());
    status.publish(&headset.snapshot(), headset.has_battery_object()).await;

    let end = loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    SessionEvent::Headset(event) => {
                        handle_headset_event(config, &headset, &event).await;
                    }
                    SessionEvent::BatteryRegistered { name } => debug!(%name, "Battery registered"),
                    SessionEvent::BatteryUnregistered { name } => debug!(%name, "Battery unregistered"),
                    SessionEvent::ReceiverLost { reason } => {
                        warn!(%reason, "Receiver lost");
                        break SessionEnd::ReceiverLost;
                    }
                }
                status.publish(&headset.snapshot(), headset.has_battery_object()).await;
            }
            () = shutdown.recv() => break SessionEnd::Shutdown,
        }
    };

    info!("Unbinding receiver");
    tokio::task::spawn_blocking(move || {
        reader.stop();
        headset.unbind();
    })
    .await
    .context("Receiver teardown failed")?;
    status.clear().await;

    Ok(end)
}

async fn handle_headset_event(
    config: &Config,
    headset: &Arc<BoundHeadset>,
    event: &HeadsetEvent,
) {
    match event {
        HeadsetEvent::Connected => {
            if let Some(level) = config.device.sidetone {
                apply_sidetone(headset, level).await;
            }
        }
        HeadsetEvent::Disconnected => {}
        HeadsetEvent::BatteryChanged(battery) => {
            info!(
                status = ?battery.status,
                capacity = battery.capacity,
                level = ?battery.capacity_level,
                "Battery update"
            );
        }
        HeadsetEvent::FirmwareChanged(firmware) => {
            info!(receiver = %firmware.receiver, headset = %firmware.headset, "Firmware update");
        }
    }
}

/// Write the sidetone level on the blocking pool; the feature report write
/// blocks on hidapi.
async fn apply_sidetone<T, P>(headset: &Arc<Headset<T, P>>, level: u8)
where
    T: ReportTransport,
    P: Presentation,
{
    let headset = Arc::clone(headset);
    match tokio::task::spawn_blocking(move || headset.set_sidetone(level)).await {
        Ok(Ok(())) => info!(level, "Applied configured sidetone"),
        Ok(Err(e)) => warn!(level, error = %e, "Failed to apply sidetone"),
        Err(e) => warn!(level, error = %e, "Sidetone task failed"),
    }
}
