//! Telemetry Snapshot Store
//!
//! Holds the latest value of every decoded field across all message types,
//! plus reception counters. One [`SnapshotPublisher`] writes from the frame
//! delivery path; any number of [`SnapshotReader`]s copy the snapshot out.
//!
//! The writer never waits. Readers retry until they get a copy that no
//! publish overlapped, so a multi-field update is never observed half
//! applied.

mod store;

pub use store::{snapshot_store, SnapshotPublisher, SnapshotReader};

use serde::{Deserialize, Serialize};

/// Latest decoded values
///
/// Fields that no frame has set yet read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    // Fuelling
    pub vehicle_speed: u16,
    pub engine_rpm: u16,
    pub injection_quantity: u16,
    pub manifold_air_flow: u16,
    pub driver_demand: u16,

    // Inputs
    pub brake_pedal_pressed: bool,
    pub clutch_pedal_pressed: bool,
    pub handbrake_engaged: bool,
    pub gear_position: u8,

    // Temperatures
    pub coolant_temp: i16,
    pub fuel_temp: i16,
    pub inlet_air_temp: i16,
    pub ambient_air_temp: i16,
    pub battery_voltage: u16,

    // Pressures
    pub manifold_pressure: u16,
    pub ambient_pressure: u16,
    pub boost_pressure: u16,
    pub reference_voltage: u16,

    // Actuators
    pub egr_position: u16,
    pub wastegate_position: u16,

    // Status
    pub connection_state: u8,
    pub connection_uptime: u16,

    // Reception statistics
    /// Frames decoded successfully
    pub packets_received: u32,
    /// Frames rejected for any reason
    pub packet_errors: u32,
    /// Receiver-local time of the last decoded frame (ms)
    pub last_packet_time: u32,
}

impl Snapshot {
    /// Injection quantity (mg/stroke)
    pub fn injection_mg_per_stroke(&self) -> f64 {
        self.injection_quantity as f64 / 100.0
    }

    /// Manifold air flow (kg/h)
    pub fn air_flow_kg_per_hour(&self) -> f64 {
        self.manifold_air_flow as f64 / 10.0
    }

    /// Driver demand (%)
    pub fn driver_demand_percent(&self) -> f64 {
        self.driver_demand as f64 / 100.0
    }

    /// EGR valve position (%)
    pub fn egr_percent(&self) -> f64 {
        self.egr_position as f64 / 100.0
    }

    /// Wastegate position (%)
    pub fn wastegate_percent(&self) -> f64 {
        self.wastegate_position as f64 / 100.0
    }

    /// Battery voltage (V)
    pub fn battery_volts(&self) -> f64 {
        self.battery_voltage as f64 / 1000.0
    }

    /// Total frames seen, accepted or not
    pub fn frames_seen(&self) -> u64 {
        self.packets_received as u64 + self.packet_errors as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_units() {
        let snapshot = Snapshot {
            injection_quantity: 1500,
            manifold_air_flow: 300,
            driver_demand: 8000,
            egr_position: 2550,
            battery_voltage: 13_800,
            ..Default::default()
        };
        assert!((snapshot.injection_mg_per_stroke() - 15.0).abs() < 1e-9);
        assert!((snapshot.air_flow_kg_per_hour() - 30.0).abs() < 1e-9);
        assert!((snapshot.driver_demand_percent() - 80.0).abs() < 1e-9);
        assert!((snapshot.egr_percent() - 25.5).abs() < 1e-9);
        assert!((snapshot.battery_volts() - 13.8).abs() < 1e-9);
    }
}
