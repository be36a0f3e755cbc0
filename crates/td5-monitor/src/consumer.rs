//! Gauge Consumer Loop
//!
//! Polls the snapshot store, reports fresh gauge data and exports it as
//! metrics. This is the only place the ready flag is cleared.
//!
//! Packet counters, connection state and link health are exported on every
//! tick; gauge values only when new gauge data arrived.

use crate::settings::LogFormat;
use snapshot_store::{Snapshot, SnapshotReader};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Render a snapshot as one report line
pub fn render(snapshot: &Snapshot, format: LogFormat) -> String {
    match format {
        LogFormat::Json => serde_json::to_string(snapshot).unwrap_or_else(|e| {
            format!("{{\"error\":\"snapshot serialization failed: {e}\"}}")
        }),
        LogFormat::Pretty => format!(
            "{} km/h | {} rpm | inj {:.2} mg | maf {:.1} kg/h | demand {:.1}% | gear {} | \
             coolant {}°C fuel {}°C inlet {}°C ambient {}°C | batt {:.2} V | \
             map {} kPa boost {} kPa | egr {:.1}% wg {:.1}% | brake {} clutch {} handbrake {}",
            snapshot.vehicle_speed,
            snapshot.engine_rpm,
            snapshot.injection_mg_per_stroke(),
            snapshot.air_flow_kg_per_hour(),
            snapshot.driver_demand_percent(),
            snapshot.gear_position,
            snapshot.coolant_temp,
            snapshot.fuel_temp,
            snapshot.inlet_air_temp,
            snapshot.ambient_air_temp,
            snapshot.battery_volts(),
            snapshot.manifold_pressure,
            snapshot.boost_pressure,
            snapshot.egr_percent(),
            snapshot.wastegate_percent(),
            on_off(snapshot.brake_pedal_pressed),
            on_off(snapshot.clutch_pedal_pressed),
            on_off(snapshot.handbrake_engaged),
        ),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Export packet counters and connection state
///
/// These move on every frame, including rejected and Status frames, so they
/// are exported from every read rather than only on new gauge data.
pub fn record_counters(snapshot: &Snapshot, link_up: bool) {
    metrics::counter!("td5_packets_received_total").absolute(snapshot.packets_received as u64);
    metrics::counter!("td5_packet_errors_total").absolute(snapshot.packet_errors as u64);
    metrics::gauge!("td5_connection_state").set(snapshot.connection_state as f64);
    metrics::gauge!("td5_connection_uptime_seconds").set(snapshot.connection_uptime as f64);
    metrics::gauge!("td5_link_up").set(if link_up { 1.0 } else { 0.0 });
}

/// Export gauge values
pub fn record_gauges(snapshot: &Snapshot) {
    metrics::gauge!("td5_vehicle_speed_kmh").set(snapshot.vehicle_speed as f64);
    metrics::gauge!("td5_engine_rpm").set(snapshot.engine_rpm as f64);
    metrics::gauge!("td5_injection_mg_per_stroke").set(snapshot.injection_mg_per_stroke());
    metrics::gauge!("td5_manifold_air_flow_kg_h").set(snapshot.air_flow_kg_per_hour());
    metrics::gauge!("td5_driver_demand_percent").set(snapshot.driver_demand_percent());
    metrics::gauge!("td5_gear_position").set(snapshot.gear_position as f64);
    metrics::gauge!("td5_coolant_temp_celsius").set(snapshot.coolant_temp as f64);
    metrics::gauge!("td5_fuel_temp_celsius").set(snapshot.fuel_temp as f64);
    metrics::gauge!("td5_inlet_air_temp_celsius").set(snapshot.inlet_air_temp as f64);
    metrics::gauge!("td5_ambient_air_temp_celsius").set(snapshot.ambient_air_temp as f64);
    metrics::gauge!("td5_battery_volts").set(snapshot.battery_volts());
    metrics::gauge!("td5_manifold_pressure_kpa").set(snapshot.manifold_pressure as f64);
    metrics::gauge!("td5_ambient_pressure_kpa").set(snapshot.ambient_pressure as f64);
    metrics::gauge!("td5_boost_pressure_kpa").set(snapshot.boost_pressure as f64);
    metrics::gauge!("td5_egr_position_percent").set(snapshot.egr_percent());
    metrics::gauge!("td5_wastegate_position_percent").set(snapshot.wastegate_percent());
}

/// Detects a bridge that has gone quiet
#[derive(Debug)]
pub struct LinkWatch {
    timeout: Duration,
    last_frames: u64,
    last_change: Instant,
    stalled: bool,
}

/// Link state change reported by [`LinkWatch::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Lost,
    Restored,
}

impl LinkWatch {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_frames: 0,
            last_change: now,
            stalled: false,
        }
    }

    /// Whether frames have arrived within the timeout
    pub fn is_up(&self) -> bool {
        !self.stalled
    }

    /// Feed the current frame count; returns an event on a state change
    pub fn observe(&mut self, frames_seen: u64, now: Instant) -> Option<LinkEvent> {
        if frames_seen != self.last_frames {
            self.last_frames = frames_seen;
            self.last_change = now;
            if self.stalled {
                self.stalled = false;
                return Some(LinkEvent::Restored);
            }
            return None;
        }

        if !self.stalled && now.duration_since(self.last_change) >= self.timeout {
            self.stalled = true;
            return Some(LinkEvent::Lost);
        }
        None
    }
}

/// Consumer loop settings
#[derive(Debug, Clone, Copy)]
pub struct ConsumerOptions {
    pub poll_interval: Duration,
    pub link_timeout: Duration,
    pub format: LogFormat,
}

/// Poll for new data until `shutdown` resolves
///
/// Returns the last snapshot read.
pub async fn run_consumer<F>(
    reader: SnapshotReader,
    options: ConsumerOptions,
    shutdown: F,
) -> Snapshot
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(options.poll_interval);
    let mut link = LinkWatch::new(options.link_timeout, Instant::now());
    let mut reports: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Some(snapshot) = reader.take_if_ready() {
                    reports += 1;
                    info!("{}", render(&snapshot, options.format));
                    record_gauges(&snapshot);
                }

                let current = reader.read();
                match link.observe(current.frames_seen(), Instant::now()) {
                    Some(LinkEvent::Lost) => warn!(
                        timeout_ms = options.link_timeout.as_millis() as u64,
                        "No frames from ECU bridge"
                    ),
                    Some(LinkEvent::Restored) => info!("ECU bridge frames resumed"),
                    None => {}
                }
                record_counters(&current, link.is_up());
            }
        }
    }

    let last = reader.read();
    info!(
        reports,
        received = last.packets_received,
        errors = last.packet_errors,
        "Consumer stopped"
    );
    last
}
