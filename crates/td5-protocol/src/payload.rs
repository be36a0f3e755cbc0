//! Payload Layouts and Message Dispatch
//!
//! One decode function per message type. Each checks the payload is exactly
//! the size of its layout before reading any field.

use crate::error::FrameError;
use crate::wire::MessageType;
use serde::{Deserialize, Serialize};

/// Switch bits carried in the Inputs payload
pub mod switch {
    /// Brake pedal pressed
    pub const BRAKE: u8 = 0x01;
    /// Clutch pedal pressed
    pub const CLUTCH: u8 = 0x04;
    /// Handbrake engaged
    pub const HANDBRAKE: u8 = 0x08;
}

#[inline]
fn le_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
fn le_i16(b: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
fn le_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn expect_size(ty: MessageType, payload: &[u8]) -> Result<(), FrameError> {
    if payload.len() != ty.payload_size() {
        return Err(FrameError::PayloadSizeMismatch {
            message_type: ty.name(),
            expected: ty.payload_size(),
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Fuelling data (0x01)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FuellingPayload {
    /// Vehicle speed (km/h)
    pub vehicle_speed: u16,
    /// Engine speed (RPM)
    pub engine_rpm: u16,
    /// Injection quantity (mg/stroke * 100)
    pub injection_quantity: u16,
    /// Manifold air flow (kg/h * 10)
    pub manifold_air_flow: u16,
    /// Driver demand (% * 100)
    pub driver_demand: u16,
}

impl FuellingPayload {
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        expect_size(MessageType::Fuelling, payload)?;
        Ok(Self {
            vehicle_speed: le_u16(payload, 0),
            engine_rpm: le_u16(payload, 2),
            injection_quantity: le_u16(payload, 4),
            manifold_air_flow: le_u16(payload, 6),
            driver_demand: le_u16(payload, 8),
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.vehicle_speed.to_le_bytes());
        out.extend_from_slice(&self.engine_rpm.to_le_bytes());
        out.extend_from_slice(&self.injection_quantity.to_le_bytes());
        out.extend_from_slice(&self.manifold_air_flow.to_le_bytes());
        out.extend_from_slice(&self.driver_demand.to_le_bytes());
    }
}

/// Switch inputs (0x02)
///
/// Two trailing reserved bytes are skipped on decode and zeroed on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputsPayload {
    /// Bit field, see [`switch`]
    pub switch_states: u8,
    /// Gear position (0-7)
    pub gear_position: u8,
}

impl InputsPayload {
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        expect_size(MessageType::Inputs, payload)?;
        Ok(Self {
            switch_states: payload[0],
            gear_position: payload[1],
        })
    }

    pub fn brake_pressed(&self) -> bool {
        self.switch_states & switch::BRAKE != 0
    }

    pub fn clutch_pressed(&self) -> bool {
        self.switch_states & switch::CLUTCH != 0
    }

    pub fn handbrake_engaged(&self) -> bool {
        self.switch_states & switch::HANDBRAKE != 0
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.switch_states, self.gear_position, 0, 0]);
    }
}

/// Temperatures (0x03)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemperaturesPayload {
    /// Coolant temperature (°C)
    pub coolant_temp: i16,
    /// Fuel temperature (°C)
    pub fuel_temp: i16,
    /// Inlet air temperature (°C)
    pub inlet_air_temp: i16,
    /// Ambient air temperature (°C)
    pub ambient_air_temp: i16,
    /// Battery voltage (mV)
    pub battery_voltage: u16,
}

impl TemperaturesPayload {
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        expect_size(MessageType::Temperatures, payload)?;
        Ok(Self {
            coolant_temp: le_i16(payload, 0),
            fuel_temp: le_i16(payload, 2),
            inlet_air_temp: le_i16(payload, 4),
            ambient_air_temp: le_i16(payload, 6),
            battery_voltage: le_u16(payload, 8),
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.coolant_temp.to_le_bytes());
        out.extend_from_slice(&self.fuel_temp.to_le_bytes());
        out.extend_from_slice(&self.inlet_air_temp.to_le_bytes());
        out.extend_from_slice(&self.ambient_air_temp.to_le_bytes());
        out.extend_from_slice(&self.battery_voltage.to_le_bytes());
    }
}

/// Pressures (0x04)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PressuresPayload {
    /// Manifold absolute pressure (kPa)
    pub manifold_pressure: u16,
    /// Ambient pressure (kPa)
    pub ambient_pressure: u16,
    /// Boost pressure, MAP - AAP (kPa)
    pub boost_pressure: u16,
    /// Sensor reference voltage (mV)
    pub reference_voltage: u16,
}

impl PressuresPayload {
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        expect_size(MessageType::Pressures, payload)?;
        Ok(Self {
            manifold_pressure: le_u16(payload, 0),
            ambient_pressure: le_u16(payload, 2),
            boost_pressure: le_u16(payload, 4),
            reference_voltage: le_u16(payload, 6),
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.manifold_pressure.to_le_bytes());
        out.extend_from_slice(&self.ambient_pressure.to_le_bytes());
        out.extend_from_slice(&self.boost_pressure.to_le_bytes());
        out.extend_from_slice(&self.reference_voltage.to_le_bytes());
    }
}

/// Actuator positions (0x05)
///
/// Four trailing reserved bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActuatorsPayload {
    /// EGR valve position (% * 100)
    pub egr_position: u16,
    /// Wastegate position (% * 100)
    pub wastegate_position: u16,
}

impl ActuatorsPayload {
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        expect_size(MessageType::Actuators, payload)?;
        Ok(Self {
            egr_position: le_u16(payload, 0),
            wastegate_position: le_u16(payload, 2),
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.egr_position.to_le_bytes());
        out.extend_from_slice(&self.wastegate_position.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
    }
}

/// ECU bridge status (0x06)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusPayload {
    /// ECU connection state (0-4)
    pub connection_state: u8,
    /// Last error code reported by the ECU
    pub last_error_code: u8,
    /// Seconds since the ECU session was established
    pub connection_uptime: u16,
    /// Frames broadcast by the bridge since boot
    pub total_packets_sent: u32,
}

impl StatusPayload {
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        expect_size(MessageType::Status, payload)?;
        Ok(Self {
            connection_state: payload[0],
            last_error_code: payload[1],
            connection_uptime: le_u16(payload, 2),
            total_packets_sent: le_u32(payload, 4),
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.connection_state, self.last_error_code]);
        out.extend_from_slice(&self.connection_uptime.to_le_bytes());
        out.extend_from_slice(&self.total_packets_sent.to_le_bytes());
    }
}

/// A decoded payload, one variant per message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Fuelling(FuellingPayload),
    Inputs(InputsPayload),
    Temperatures(TemperaturesPayload),
    Pressures(PressuresPayload),
    Actuators(ActuatorsPayload),
    Status(StatusPayload),
}

impl Message {
    /// Dispatch on the raw tag and decode the payload
    pub fn decode(tag: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let message = match MessageType::try_from(tag)? {
            MessageType::Fuelling => Message::Fuelling(FuellingPayload::decode(payload)?),
            MessageType::Inputs => Message::Inputs(InputsPayload::decode(payload)?),
            MessageType::Temperatures => {
                Message::Temperatures(TemperaturesPayload::decode(payload)?)
            }
            MessageType::Pressures => Message::Pressures(PressuresPayload::decode(payload)?),
            MessageType::Actuators => Message::Actuators(ActuatorsPayload::decode(payload)?),
            MessageType::Status => Message::Status(StatusPayload::decode(payload)?),
        };
        Ok(message)
    }

    /// Message type of this payload
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Fuelling(_) => MessageType::Fuelling,
            Message::Inputs(_) => MessageType::Inputs,
            Message::Temperatures(_) => MessageType::Temperatures,
            Message::Pressures(_) => MessageType::Pressures,
            Message::Actuators(_) => MessageType::Actuators,
            Message::Status(_) => MessageType::Status,
        }
    }

    /// Encode the payload bytes (without header or checksum)
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.message_type().payload_size());
        match self {
            Message::Fuelling(p) => p.encode_into(&mut out),
            Message::Inputs(p) => p.encode_into(&mut out),
            Message::Temperatures(p) => p.encode_into(&mut out),
            Message::Pressures(p) => p.encode_into(&mut out),
            Message::Actuators(p) => p.encode_into(&mut out),
            Message::Status(p) => p.encode_into(&mut out),
        }
        out
    }
}
