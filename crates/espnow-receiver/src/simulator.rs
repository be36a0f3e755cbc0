//! Simulated Td5 ECU Bridge
//!
//! Produces the broadcast a real bridge would send, one message type after
//! another, so the receive path can run without hardware.

use crate::source::{RawFrame, SourceAddress};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use td5_protocol::{
    encode_raw, switch, ActuatorsPayload, FrameError, FuellingPayload, InputsPayload, Message,
    MessageType, PressuresPayload, StatusPayload, TemperaturesPayload,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Simulator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Time between frames (ms)
    pub frame_interval_ms: u64,
    /// Flip a byte in every Nth frame; 0 disables corruption
    pub corrupt_every: u32,
    /// Address the simulated bridge reports
    pub source: SourceAddress,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 20,
            corrupt_every: 0,
            source: SourceAddress([0x02, 0x7d, 0x5e, 0xc5, 0x00, 0x01]),
        }
    }
}

/// Generates frames with plausible engine values
pub struct SimulatedEcu {
    config: SimulatorConfig,
    sequence: u16,
    tick: u64,
}

impl SimulatedEcu {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            sequence: 0,
            tick: 0,
        }
    }

    /// Number of frames produced so far
    pub fn frames_sent(&self) -> u64 {
        self.tick
    }

    /// Next frame in the broadcast cycle
    pub fn next_frame(&mut self) -> Result<RawFrame, FrameError> {
        let message = self.message_for(self.tick);
        let payload = message.encode_payload();
        let mut frame = self.raw_frame(message.message_type().as_u8(), &payload)?;
        self.tick += 1;

        let every = self.config.corrupt_every as u64;
        if every > 0 && self.tick % every == 0 {
            let at = (self.hash(0xC0) as usize) % frame.data.len();
            frame.data[at] ^= 0x5A;
            debug!("Simulator corrupted frame {} at byte {}", self.tick, at);
        }
        Ok(frame)
    }

    /// Encode an arbitrary tag and payload with the bridge's timestamp and
    /// sequence counter
    ///
    /// The sequence only advances when the frame could be encoded.
    pub fn raw_frame(&mut self, message_type: u8, payload: &[u8]) -> Result<RawFrame, FrameError> {
        let data = encode_raw(self.uptime_ms(), self.sequence, message_type, payload)?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(RawFrame {
            source: self.config.source,
            data,
        })
    }

    fn uptime_ms(&self) -> u32 {
        self.tick.wrapping_mul(self.config.frame_interval_ms) as u32
    }

    fn hash(&self, salt: u8) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        salt.hash(&mut hasher);
        hasher.finish()
    }

    fn message_for(&self, tick: u64) -> Message {
        let ty = MessageType::ALL[(tick % MessageType::ALL.len() as u64) as usize];
        let h = self.hash(ty.as_u8());

        match ty {
            // 750-3750 rpm, 0-119 km/h
            MessageType::Fuelling => Message::Fuelling(FuellingPayload {
                vehicle_speed: (h % 120) as u16,
                engine_rpm: 750 + (h % 3000) as u16,
                injection_quantity: 500 + (h % 4500) as u16,
                manifold_air_flow: 200 + (h % 3000) as u16,
                driver_demand: (h % 10_001) as u16,
            }),
            MessageType::Inputs => {
                let mut switches = 0;
                if h & 0x1 != 0 {
                    switches |= switch::BRAKE;
                }
                if h & 0x2 != 0 {
                    switches |= switch::CLUTCH;
                }
                if h & 0x4 != 0 {
                    switches |= switch::HANDBRAKE;
                }
                Message::Inputs(InputsPayload {
                    switch_states: switches,
                    gear_position: ((h >> 8) % 8) as u8,
                })
            }
            // coolant 70-104 °C, ambient -10-29 °C
            MessageType::Temperatures => Message::Temperatures(TemperaturesPayload {
                coolant_temp: 70 + (h % 35) as i16,
                fuel_temp: 20 + ((h >> 8) % 40) as i16,
                inlet_air_temp: 15 + ((h >> 16) % 40) as i16,
                ambient_air_temp: ((h >> 24) % 40) as i16 - 10,
                battery_voltage: 12_000 + ((h >> 32) % 2_500) as u16,
            }),
            MessageType::Pressures => {
                let ambient = 95 + (h % 8) as u16;
                let manifold = ambient + ((h >> 8) % 120) as u16;
                Message::Pressures(PressuresPayload {
                    manifold_pressure: manifold,
                    ambient_pressure: ambient,
                    boost_pressure: manifold - ambient,
                    reference_voltage: 4_950 + ((h >> 16) % 100) as u16,
                })
            }
            MessageType::Actuators => Message::Actuators(ActuatorsPayload {
                egr_position: (h % 10_001) as u16,
                wastegate_position: ((h >> 16) % 10_001) as u16,
            }),
            MessageType::Status => Message::Status(StatusPayload {
                connection_state: 3,
                last_error_code: 0,
                connection_uptime: (self.uptime_ms() / 1000) as u16,
                total_packets_sent: tick as u32,
            }),
        }
    }
}

/// Run a simulated bridge on a tokio task, delivering into a bounded channel
///
/// The task stops when the receiving end is dropped.
pub fn spawn_simulator(config: SimulatorConfig, capacity: usize) -> mpsc::Receiver<RawFrame> {
    let (tx, rx) = mpsc::channel(capacity);
    let interval = Duration::from_millis(config.frame_interval_ms.max(1));

    tokio::spawn(async move {
        info!(
            source = %config.source,
            interval_ms = interval.as_millis() as u64,
            "Simulated ECU bridge started"
        );
        let mut ecu = SimulatedEcu::new(config);
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let frame = match ecu.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Simulator skipped an unencodable frame: {}", e);
                    continue;
                }
            };
            if tx.send(frame).await.is_err() {
                debug!("Frame receiver dropped, stopping simulator");
                break;
            }
        }

        info!(frames = ecu.frames_sent(), "Simulated ECU bridge stopped");
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_through_every_type() {
        let mut ecu = SimulatedEcu::new(SimulatorConfig::default());
        for expected in MessageType::ALL.iter().chain(MessageType::ALL.iter()) {
            let frame = ecu.next_frame().unwrap();
            let (_, message) = td5_protocol::decode(&frame.data).unwrap();
            assert_eq!(message.message_type(), *expected);
        }
        assert_eq!(ecu.frames_sent(), 12);
    }

    #[test]
    fn test_sequence_and_timestamp_advance() {
        let mut ecu = SimulatedEcu::new(SimulatorConfig {
            frame_interval_ms: 50,
            ..Default::default()
        });
        let first = td5_protocol::validate(&ecu.next_frame().unwrap().data).unwrap().header;
        let second_frame = ecu.next_frame().unwrap();
        let second = td5_protocol::validate(&second_frame.data).unwrap().header;
        assert_eq!(second.sequence, first.sequence + 1);
        assert_eq!(second.timestamp - first.timestamp, 50);
    }

    #[test]
    fn test_corruption_rate() {
        let mut ecu = SimulatedEcu::new(SimulatorConfig {
            corrupt_every: 4,
            ..Default::default()
        });
        let rejected = (0..40)
            .filter(|_| td5_protocol::decode(&ecu.next_frame().unwrap().data).is_err())
            .count();
        assert_eq!(rejected, 10);
    }

    #[test]
    fn test_values_in_range() {
        let mut ecu = SimulatedEcu::new(SimulatorConfig::default());
        for _ in 0..600 {
            match td5_protocol::decode(&ecu.next_frame().unwrap().data).unwrap().1 {
                Message::Fuelling(p) => assert!((750..3750).contains(&p.engine_rpm)),
                Message::Inputs(p) => assert!(p.gear_position < 8),
                Message::Temperatures(p) => assert!((70..105).contains(&p.coolant_temp)),
                Message::Pressures(p) => {
                    assert_eq!(p.boost_pressure, p.manifold_pressure - p.ambient_pressure)
                }
                Message::Actuators(p) => assert!(p.egr_position <= 10_000),
                Message::Status(p) => assert_eq!(p.connection_state, 3),
            }
        }
    }

    #[test]
    fn test_oversized_frame_is_not_produced() {
        let mut ecu = SimulatedEcu::new(SimulatorConfig::default());
        let result = ecu.raw_frame(MessageType::Status.as_u8(), &[0u8; 241]);
        assert_eq!(result.unwrap_err(), FrameError::PayloadTooLarge(241));

        // the failed frame did not consume a sequence number
        let next = ecu.next_frame().unwrap();
        assert_eq!(td5_protocol::validate(&next.data).unwrap().header.sequence, 0);
    }

    #[test]
    fn test_raw_frame_with_unknown_tag() {
        let mut ecu = SimulatedEcu::new(SimulatorConfig::default());
        let frame = ecu.raw_frame(0x7F, &[1, 2, 3]).unwrap();
        assert_eq!(
            td5_protocol::decode(&frame.data).unwrap_err(),
            FrameError::UnknownMessageType(0x7F)
        );
    }
}
