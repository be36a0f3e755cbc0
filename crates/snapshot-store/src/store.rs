//! Sequence-Locked Snapshot Storage

use crate::Snapshot;
use std::sync::atomic::{
    fence, AtomicBool, AtomicI16, AtomicU16, AtomicU32, AtomicU8, Ordering,
};
use std::sync::Arc;
use td5_protocol::Message;

/// One atomic per snapshot field
#[derive(Default)]
struct Cells {
    vehicle_speed: AtomicU16,
    engine_rpm: AtomicU16,
    injection_quantity: AtomicU16,
    manifold_air_flow: AtomicU16,
    driver_demand: AtomicU16,

    brake_pedal_pressed: AtomicBool,
    clutch_pedal_pressed: AtomicBool,
    handbrake_engaged: AtomicBool,
    gear_position: AtomicU8,

    coolant_temp: AtomicI16,
    fuel_temp: AtomicI16,
    inlet_air_temp: AtomicI16,
    ambient_air_temp: AtomicI16,
    battery_voltage: AtomicU16,

    manifold_pressure: AtomicU16,
    ambient_pressure: AtomicU16,
    boost_pressure: AtomicU16,
    reference_voltage: AtomicU16,

    egr_position: AtomicU16,
    wastegate_position: AtomicU16,

    connection_state: AtomicU8,
    connection_uptime: AtomicU16,

    packets_received: AtomicU32,
    packet_errors: AtomicU32,
    last_packet_time: AtomicU32,
}

impl Cells {
    fn apply(&self, message: &Message) {
        const R: Ordering = Ordering::Relaxed;
        match message {
            Message::Fuelling(p) => {
                self.vehicle_speed.store(p.vehicle_speed, R);
                self.engine_rpm.store(p.engine_rpm, R);
                self.injection_quantity.store(p.injection_quantity, R);
                self.manifold_air_flow.store(p.manifold_air_flow, R);
                self.driver_demand.store(p.driver_demand, R);
            }
            Message::Inputs(p) => {
                self.brake_pedal_pressed.store(p.brake_pressed(), R);
                self.clutch_pedal_pressed.store(p.clutch_pressed(), R);
                self.handbrake_engaged.store(p.handbrake_engaged(), R);
                self.gear_position.store(p.gear_position, R);
            }
            Message::Temperatures(p) => {
                self.coolant_temp.store(p.coolant_temp, R);
                self.fuel_temp.store(p.fuel_temp, R);
                self.inlet_air_temp.store(p.inlet_air_temp, R);
                self.ambient_air_temp.store(p.ambient_air_temp, R);
                self.battery_voltage.store(p.battery_voltage, R);
            }
            Message::Pressures(p) => {
                self.manifold_pressure.store(p.manifold_pressure, R);
                self.ambient_pressure.store(p.ambient_pressure, R);
                self.boost_pressure.store(p.boost_pressure, R);
                self.reference_voltage.store(p.reference_voltage, R);
            }
            Message::Actuators(p) => {
                self.egr_position.store(p.egr_position, R);
                self.wastegate_position.store(p.wastegate_position, R);
            }
            // last_error_code and total_packets_sent stay with the message
            Message::Status(p) => {
                self.connection_state.store(p.connection_state, R);
                self.connection_uptime.store(p.connection_uptime, R);
            }
        }
    }

    fn store_all(&self, s: &Snapshot) {
        const R: Ordering = Ordering::Relaxed;
        self.vehicle_speed.store(s.vehicle_speed, R);
        self.engine_rpm.store(s.engine_rpm, R);
        self.injection_quantity.store(s.injection_quantity, R);
        self.manifold_air_flow.store(s.manifold_air_flow, R);
        self.driver_demand.store(s.driver_demand, R);
        self.brake_pedal_pressed.store(s.brake_pedal_pressed, R);
        self.clutch_pedal_pressed.store(s.clutch_pedal_pressed, R);
        self.handbrake_engaged.store(s.handbrake_engaged, R);
        self.gear_position.store(s.gear_position, R);
        self.coolant_temp.store(s.coolant_temp, R);
        self.fuel_temp.store(s.fuel_temp, R);
        self.inlet_air_temp.store(s.inlet_air_temp, R);
        self.ambient_air_temp.store(s.ambient_air_temp, R);
        self.battery_voltage.store(s.battery_voltage, R);
        self.manifold_pressure.store(s.manifold_pressure, R);
        self.ambient_pressure.store(s.ambient_pressure, R);
        self.boost_pressure.store(s.boost_pressure, R);
        self.reference_voltage.store(s.reference_voltage, R);
        self.egr_position.store(s.egr_position, R);
        self.wastegate_position.store(s.wastegate_position, R);
        self.connection_state.store(s.connection_state, R);
        self.connection_uptime.store(s.connection_uptime, R);
        self.packets_received.store(s.packets_received, R);
        self.packet_errors.store(s.packet_errors, R);
        self.last_packet_time.store(s.last_packet_time, R);
    }

    fn load_all(&self) -> Snapshot {
        const R: Ordering = Ordering::Relaxed;
        Snapshot {
            vehicle_speed: self.vehicle_speed.load(R),
            engine_rpm: self.engine_rpm.load(R),
            injection_quantity: self.injection_quantity.load(R),
            manifold_air_flow: self.manifold_air_flow.load(R),
            driver_demand: self.driver_demand.load(R),
            brake_pedal_pressed: self.brake_pedal_pressed.load(R),
            clutch_pedal_pressed: self.clutch_pedal_pressed.load(R),
            handbrake_engaged: self.handbrake_engaged.load(R),
            gear_position: self.gear_position.load(R),
            coolant_temp: self.coolant_temp.load(R),
            fuel_temp: self.fuel_temp.load(R),
            inlet_air_temp: self.inlet_air_temp.load(R),
            ambient_air_temp: self.ambient_air_temp.load(R),
            battery_voltage: self.battery_voltage.load(R),
            manifold_pressure: self.manifold_pressure.load(R),
            ambient_pressure: self.ambient_pressure.load(R),
            boost_pressure: self.boost_pressure.load(R),
            reference_voltage: self.reference_voltage.load(R),
            egr_position: self.egr_position.load(R),
            wastegate_position: self.wastegate_position.load(R),
            connection_state: self.connection_state.load(R),
            connection_uptime: self.connection_uptime.load(R),
            packets_received: self.packets_received.load(R),
            packet_errors: self.packet_errors.load(R),
            last_packet_time: self.last_packet_time.load(R),
        }
    }
}

#[derive(Default)]
struct Shared {
    /// Odd while a write is in progress
    sequence: AtomicU32,
    /// New gauge data since the consumer last cleared it
    data_ready: AtomicBool,
    cells: Cells,
}

/// Create an empty store and return its two ends
pub fn snapshot_store() -> (SnapshotPublisher, SnapshotReader) {
    let shared = Arc::new(Shared::default());
    (
        SnapshotPublisher {
            shared: Arc::clone(&shared),
        },
        SnapshotReader { shared },
    )
}

/// Write end of the store
///
/// Not `Clone`: there is exactly one writer, and every write method takes
/// `&mut self`.
pub struct SnapshotPublisher {
    shared: Arc<Shared>,
}

impl SnapshotPublisher {
    /// Another read handle onto this store
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Apply a decoded message
    ///
    /// Counts the frame as received and stamps `last_packet_time`. Sets the
    /// ready flag unless the message is status metadata.
    pub fn publish(&mut self, message: &Message, received_at_ms: u32) {
        self.write(|cells| {
            cells.apply(message);
            let received = cells.packets_received.load(Ordering::Relaxed);
            cells
                .packets_received
                .store(received.wrapping_add(1), Ordering::Relaxed);
            cells
                .last_packet_time
                .store(received_at_ms, Ordering::Relaxed);
        });

        if message.message_type().carries_gauge_data() {
            self.shared.data_ready.store(true, Ordering::Release);
        }
    }

    /// Count a rejected frame
    pub fn record_error(&mut self) {
        self.write(|cells| {
            let errors = cells.packet_errors.load(Ordering::Relaxed);
            cells
                .packet_errors
                .store(errors.wrapping_add(1), Ordering::Relaxed);
        });
    }

    /// Zero every field and counter and clear the ready flag
    pub fn reset(&mut self) {
        self.shared.data_ready.store(false, Ordering::Release);
        self.write(|cells| cells.store_all(&Snapshot::default()));
    }

    fn write<F: FnOnce(&Cells)>(&mut self, f: F) {
        let shared = &*self.shared;
        let seq = shared.sequence.load(Ordering::Relaxed);
        shared.sequence.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        f(&shared.cells);

        shared.sequence.store(seq.wrapping_add(2), Ordering::Release);
    }
}

/// Read end of the store
#[derive(Clone)]
pub struct SnapshotReader {
    shared: Arc<Shared>,
}

impl SnapshotReader {
    /// Copy out a consistent snapshot
    ///
    /// Spins while a publish is in progress; the writer holds the sequence
    /// odd only for the handful of stores one message needs.
    pub fn read(&self) -> Snapshot {
        let shared = &*self.shared;
        loop {
            let before = shared.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let snapshot = shared.cells.load_all();

            fence(Ordering::Acquire);
            let after = shared.sequence.load(Ordering::Relaxed);
            if before == after {
                return snapshot;
            }
        }
    }

    /// Whether gauge data arrived since the flag was last cleared
    pub fn is_ready(&self) -> bool {
        self.shared.data_ready.load(Ordering::Acquire)
    }

    /// Acknowledge the current data
    pub fn clear_ready(&self) {
        self.shared.data_ready.store(false, Ordering::Release);
    }

    /// Clear the ready flag and return the snapshot if it was set
    ///
    /// The flag is cleared before copying, so a publish landing during the
    /// copy sets it again and is picked up on the next call.
    pub fn take_if_ready(&self) -> Option<Snapshot> {
        if self.shared.data_ready.swap(false, Ordering::AcqRel) {
            Some(self.read())
        } else {
            None
        }
    }
}
