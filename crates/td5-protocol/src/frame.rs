//! Frame Validation and Encoding

use crate::error::FrameError;
use crate::payload::Message;
use crate::wire::{xor_checksum, Header, HEADER_SIZE, MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE};

/// A frame that passed size, checksum and length checks
///
/// Borrows the receive buffer; nothing is copied until the payload is
/// decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Parsed header
    pub header: Header,
    /// Payload bytes, exactly `header.data_length` long
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Dispatch the payload on the header's message type
    pub fn decode_message(&self) -> Result<Message, FrameError> {
        Message::decode(self.header.message_type, self.payload)
    }
}

/// Validate a raw frame
///
/// Checks run cheapest first and stop at the first failure: minimum size,
/// then checksum, then the declared payload length. The length field is not
/// read until the checksum has matched.
pub fn validate(bytes: &[u8]) -> Result<Frame<'_>, FrameError> {
    let len = bytes.len();
    if len < MIN_FRAME_SIZE {
        return Err(FrameError::TooShort {
            len,
            min: MIN_FRAME_SIZE,
        });
    }

    let (body, trailer) = bytes.split_at(len - 1);
    let received = trailer[0];
    let calculated = xor_checksum(body);
    if calculated != received {
        return Err(FrameError::ChecksumMismatch {
            expected: received,
            actual: calculated,
        });
    }

    let header = Header::decode(body).ok_or(FrameError::TooShort {
        len,
        min: MIN_FRAME_SIZE,
    })?;
    let payload = &body[HEADER_SIZE..];
    if header.data_length as usize != payload.len() {
        return Err(FrameError::LengthMismatch {
            declared: header.data_length,
            actual: payload.len(),
        });
    }

    Ok(Frame { header, payload })
}

/// Builds checksummed frames, as the ECU bridge does
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    sequence: u16,
}

impl FrameBuilder {
    /// Create a builder whose first frame uses sequence 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a given sequence number
    pub fn with_sequence(sequence: u16) -> Self {
        Self { sequence }
    }

    /// Sequence number the next frame will carry
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    /// Encode a message and advance the sequence number
    pub fn build(&mut self, timestamp: u32, message: &Message) -> Result<Vec<u8>, FrameError> {
        let frame = encode_raw(
            timestamp,
            self.sequence,
            message.message_type().as_u8(),
            &message.encode_payload(),
        )?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }
}

/// Encode an arbitrary tag and payload into a checksummed frame
///
/// The tag is not checked, so this can produce frames the receiver will
/// reject as unknown.
pub fn encode_raw(
    timestamp: u32,
    sequence: u16,
    message_type: u8,
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge(payload.len()));
    }

    let header = Header {
        timestamp,
        sequence,
        message_type,
        data_length: payload.len() as u8,
    };

    let mut frame = Vec::with_capacity(MIN_FRAME_SIZE + payload.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);
    frame.push(xor_checksum(&frame));
    Ok(frame)
}
