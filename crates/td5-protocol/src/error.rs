//! Frame Error Types

use thiserror::Error;

/// Reasons a received frame is rejected
///
/// Every variant is a per-frame condition: the frame is dropped and the
/// receiver keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Fewer bytes than a header plus checksum
    #[error("Frame too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// Trailing XOR checksum does not match the frame contents
    #[error("Checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Header `data_length` disagrees with the bytes actually received
    #[error("Length mismatch: header declares {declared} payload bytes, frame carries {actual}")]
    LengthMismatch { declared: u8, actual: usize },

    /// Message type tag outside the known set
    #[error("Unknown message type {0:#04X}")]
    UnknownMessageType(u8),

    /// Payload size is wrong for the message type it claims to be
    #[error("{message_type} payload must be {expected} bytes, got {actual}")]
    PayloadSizeMismatch {
        message_type: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Payload does not fit in a single frame (encoder only)
    #[error("Payload of {0} bytes exceeds the {max} byte frame limit", max = crate::MAX_PAYLOAD_SIZE)]
    PayloadTooLarge(usize),
}
