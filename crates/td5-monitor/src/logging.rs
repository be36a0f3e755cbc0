//! Logging and Metrics Setup

use crate::settings::{LogFormat, LoggingSettings, MetricsSettings};
use anyhow::{anyhow, Context};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::str::FromStr;
use tracing::{info, Level};

/// Initialize the global tracing subscriber
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let level = Level::from_str(&settings.level)
        .with_context(|| format!("invalid log level '{}'", settings.level))?;

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);

    let installed = match settings.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("failed to set tracing subscriber: {e}"))
}

/// Start the Prometheus exporter if enabled
pub fn init_metrics(settings: &MetricsSettings) -> anyhow::Result<()> {
    if !settings.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(settings.listen)
        .install()
        .context("failed to install Prometheus exporter")?;

    info!(listen = %settings.listen, "Prometheus metrics exporter listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_level() {
        let settings = LoggingSettings {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(init_logging(&settings).is_err());
    }

    #[test]
    fn test_metrics_disabled_is_noop() {
        assert!(init_metrics(&MetricsSettings::default()).is_ok());
    }
}
