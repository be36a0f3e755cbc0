//! Td5 ESP-NOW Wire Format
//!
//! Every frame is byte-packed and little-endian:
//!
//! ```text
//! +-----------+----------+--------------+-------------+-----------------+----------+
//! | timestamp | sequence | message_type | data_length | payload         | checksum |
//! | u32       | u16      | u8           | u8          | data_length B   | u8       |
//! +-----------+----------+--------------+-------------+-----------------+----------+
//! ```
//!
//! The checksum is the XOR of every byte before it.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};

/// Header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Trailing checksum size in bytes
pub const CHECKSUM_SIZE: usize = 1;

/// Smallest frame the validator will look at (header + checksum)
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Largest payload a transmitter may put in one frame
pub const MAX_PAYLOAD_SIZE: usize = 240;

/// Largest frame on the wire
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CHECKSUM_SIZE;

/// Message types broadcast by the ECU bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Speed, RPM, injection quantity, air flow, driver demand (0x01)
    Fuelling = 0x01,
    /// Pedal/handbrake switches and gear (0x02)
    Inputs = 0x02,
    /// Coolant, fuel, air temperatures and battery voltage (0x03)
    Temperatures = 0x03,
    /// Manifold, ambient, boost pressure and reference voltage (0x04)
    Pressures = 0x04,
    /// EGR and wastegate positions (0x05)
    Actuators = 0x05,
    /// ECU link state, no gauge data (0x06)
    Status = 0x06,
}

impl MessageType {
    /// All message types in tag order
    pub const ALL: [MessageType; 6] = [
        MessageType::Fuelling,
        MessageType::Inputs,
        MessageType::Temperatures,
        MessageType::Pressures,
        MessageType::Actuators,
        MessageType::Status,
    ];

    /// Get the tag byte
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Exact payload size in bytes for this message type
    pub fn payload_size(&self) -> usize {
        match self {
            MessageType::Fuelling | MessageType::Temperatures => 10,
            MessageType::Inputs => 4,
            MessageType::Pressures | MessageType::Actuators | MessageType::Status => 8,
        }
    }

    /// Whether a frame of this type carries gauge values
    pub fn carries_gauge_data(&self) -> bool {
        !matches!(self, MessageType::Status)
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::Fuelling => "Fuelling",
            MessageType::Inputs => "Inputs",
            MessageType::Temperatures => "Temperatures",
            MessageType::Pressures => "Pressures",
            MessageType::Actuators => "Actuators",
            MessageType::Status => "Status",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0x01 => Ok(MessageType::Fuelling),
            0x02 => Ok(MessageType::Inputs),
            0x03 => Ok(MessageType::Temperatures),
            0x04 => Ok(MessageType::Pressures),
            0x05 => Ok(MessageType::Actuators),
            0x06 => Ok(MessageType::Status),
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Frame header
///
/// `message_type` is kept raw: an unknown tag is only an error once the
/// frame has passed integrity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    /// Milliseconds since the transmitter booted
    pub timestamp: u32,
    /// Per-transmitter incrementing counter
    pub sequence: u16,
    /// Raw message type tag
    pub message_type: u8,
    /// Declared payload length
    pub data_length: u8,
}

impl Header {
    /// Decode a header from the start of `buf`
    ///
    /// Returns `None` if fewer than `HEADER_SIZE` bytes are available.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            timestamp: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            sequence: u16::from_le_bytes([buf[4], buf[5]]),
            message_type: buf[6],
            data_length: buf[7],
        })
    }

    /// Encode the header
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[4..6].copy_from_slice(&self.sequence.to_le_bytes());
        buf[6] = self.message_type;
        buf[7] = self.data_length;
        buf
    }
}

/// XOR-fold checksum over `data`
#[inline]
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}
