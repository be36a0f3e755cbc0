//! Td5 ESP-NOW Telemetry Protocol
//!
//! This crate defines the frame format broadcast by the Td5 ECU bridge and
//! the receive-side pipeline that turns raw bytes into typed messages:
//! size check, XOR checksum, declared length, then per-type payload decode.
//!
//! Nothing here allocates on the decode path.

mod error;
mod frame;
mod payload;
mod wire;

pub use error::FrameError;
pub use frame::{encode_raw, validate, Frame, FrameBuilder};
pub use payload::{
    switch, ActuatorsPayload, FuellingPayload, InputsPayload, Message, PressuresPayload,
    StatusPayload, TemperaturesPayload,
};
pub use wire::{
    xor_checksum, Header, MessageType, CHECKSUM_SIZE, HEADER_SIZE, MAX_FRAME_SIZE,
    MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE,
};

/// Validate a raw frame and decode its payload in one step
pub fn decode(bytes: &[u8]) -> Result<(Header, Message), FrameError> {
    let frame = validate(bytes)?;
    let message = frame.decode_message()?;
    Ok((frame.header, message))
}
