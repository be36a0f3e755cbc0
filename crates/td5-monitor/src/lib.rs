//! Td5 Gauge Monitor
//!
//! Wires a frame transport to the receiver and runs the consumer loop that
//! reports the latest snapshot.

pub mod consumer;
pub mod logging;
pub mod settings;

use anyhow::Context;
use consumer::{run_consumer, ConsumerOptions};
use espnow_receiver::{run_delivery, spawn_simulator, spawn_udp_source, FrameReceiver};
use settings::{Settings, TransportKind};
use snapshot_store::{snapshot_store, Snapshot};
use std::future::Future;
use std::time::Duration;
use tracing::info;

pub use logging::{init_logging, init_metrics};

/// Run the monitor until `shutdown` resolves
///
/// Returns the last snapshot the consumer read.
pub async fn run<F>(settings: Settings, shutdown: F) -> anyhow::Result<Snapshot>
where
    F: Future<Output = ()>,
{
    init_metrics(&settings.metrics)?;

    let (publisher, reader) = snapshot_store();
    let receiver = FrameReceiver::new(publisher);

    let frames = match settings.transport {
        TransportKind::Simulator => {
            spawn_simulator(settings.simulator.clone(), settings.channel_capacity)
        }
        TransportKind::Udp => {
            let (addr, frames) = spawn_udp_source(settings.udp.bind, settings.channel_capacity)
                .await
                .context("failed to start UDP transport")?;
            info!(%addr, "Listening for Td5 frames");
            frames
        }
    };

    let delivery = tokio::spawn(run_delivery(receiver, frames));

    let options = ConsumerOptions {
        poll_interval: Duration::from_millis(settings.poll_interval_ms),
        link_timeout: Duration::from_millis(settings.link_timeout_ms),
        format: settings.logging.format,
    };
    let last = run_consumer(reader, options, shutdown).await;

    delivery.abort();
    Ok(last)
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
