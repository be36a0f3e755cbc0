//! Td5 Gauge Monitor - Main Entry Point

use td5_monitor::settings::Settings;
use td5_monitor::{init_logging, run, shutdown_signal};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.logging)?;

    info!("=== Td5 Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(transport = ?settings.transport, "Starting ESP-NOW telemetry receiver...");

    run(settings, shutdown_signal()).await?;
    Ok(())
}
