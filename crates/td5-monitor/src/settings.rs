//! Monitor Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `TD5_*` environment variables (`__` separates nested keys,
//! e.g. `TD5_UDP__BIND=0.0.0.0:4210`).

use config::{Config, ConfigError, Environment, File};
use espnow_receiver::SimulatorConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default config file, looked up relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "td5-monitor.toml";

/// Environment variable overriding the config file path
pub const CONFIG_PATH_ENV: &str = "TD5_MONITOR_CONFIG";

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Built-in simulated ECU bridge
    Simulator,
    /// One frame per UDP datagram
    Udp,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpSettings {
    /// Address to receive datagrams on
    pub bind: SocketAddr,
}

impl Default for UdpSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 4210)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Maximum level: trace, debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Serve Prometheus metrics
    pub enabled: bool,
    /// Listen address for the metrics endpoint
    pub listen: SocketAddr,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: SocketAddr::from(([127, 0, 0, 1], 9185)),
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub transport: TransportKind,
    /// Frames buffered between transport and receiver
    pub channel_capacity: usize,
    /// How often the consumer checks for new data (ms)
    pub poll_interval_ms: u64,
    /// Warn when no frame has arrived for this long (ms)
    pub link_timeout_ms: u64,
    pub simulator: SimulatorConfig,
    pub udp: UdpSettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transport: TransportKind::Simulator,
            channel_capacity: 256,
            poll_interval_ms: 100,
            link_timeout_ms: 2000,
            simulator: SimulatorConfig::default(),
            udp: UdpSettings::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl Settings {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (if it exists) and the environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TD5")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.simulator.frame_interval_ms == 0 {
            return Err(ConfigError::Message(
                "simulator.frame_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.toml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.transport, TransportKind::Simulator);
        assert_eq!(settings.udp.bind.port(), 4210);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert!(!settings.metrics.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_from("/nonexistent/td5-monitor").unwrap();
        assert_eq!(settings.poll_interval_ms, 100);
        assert_eq!(settings.channel_capacity, 256);
    }

    #[test]
    fn test_file_overrides() {
        let path = write_config(
            "td5-monitor-overrides",
            r#"
transport = "udp"
poll_interval_ms = 250

[udp]
bind = "127.0.0.1:5000"

[simulator]
corrupt_every = 7
source = "02:00:00:00:00:2a"

[logging]
format = "json"
"#,
        );

        let settings = Settings::load_from(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.transport, TransportKind::Udp);
        assert_eq!(settings.poll_interval_ms, 250);
        assert_eq!(settings.udp.bind, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.simulator.corrupt_every, 7);
        assert_eq!(settings.simulator.frame_interval_ms, 20);
        assert_eq!(settings.simulator.source.to_string(), "02:00:00:00:00:2a");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let path = write_config("td5-monitor-zero-poll", "poll_interval_ms = 0\n");
        let result = Settings::load_from(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
