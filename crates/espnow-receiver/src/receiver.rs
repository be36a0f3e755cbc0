//! Frame Delivery Path
//!
//! [`FrameReceiver::on_frame`] is what the radio driver calls for every
//! received frame. It runs to completion without awaiting, locking or
//! allocating: validate, decode, publish or count the error, return.

use crate::source::SourceAddress;
use serde::Serialize;
use snapshot_store::{SnapshotPublisher, SnapshotReader};
use std::time::Instant;
use td5_protocol::{FrameError, Message};
use tracing::{debug, trace};

/// Observes header sequence numbers to estimate lost frames
///
/// Assumes a single transmitter; interleaved senders show up as resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LossTracker {
    last_sequence: Option<u16>,
    lost: u64,
    duplicates: u64,
    resets: u32,
}

impl LossTracker {
    /// Record a sequence number and return how many frames were skipped
    pub fn observe(&mut self, sequence: u16) -> u16 {
        let mut skipped = 0;
        if let Some(last) = self.last_sequence {
            let delta = sequence.wrapping_sub(last);
            if delta == 0 {
                self.duplicates += 1;
            } else if delta < 0x8000 {
                skipped = delta - 1;
                self.lost += skipped as u64;
            } else {
                // sender rebooted or frames arrived out of order
                self.resets += 1;
            }
        }
        self.last_sequence = Some(sequence);
        skipped
    }

    pub fn lost(&self) -> u64 {
        self.lost
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }
}

/// Receiver-side diagnostics that are not part of the snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverStats {
    /// Frames handed to `on_frame`, accepted or not
    pub frames_seen: u64,
    /// Sequence gap accounting for accepted frames
    pub loss: LossTracker,
    /// Last status report from the bridge: (error code, frames it has sent)
    pub bridge_report: Option<(u8, u32)>,
    /// Most recent transmitter
    pub last_source: Option<SourceAddress>,
}

/// Validates, decodes and publishes frames into the snapshot store
pub struct FrameReceiver {
    publisher: SnapshotPublisher,
    started: Instant,
    stats: ReceiverStats,
}

impl FrameReceiver {
    /// Create a receiver that owns the store's write end
    pub fn new(publisher: SnapshotPublisher) -> Self {
        Self {
            publisher,
            started: Instant::now(),
            stats: ReceiverStats::default(),
        }
    }

    /// A read handle for the consumer
    pub fn reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    /// Handle one received frame, stamped with the receiver's uptime
    pub fn on_frame(&mut self, source: SourceAddress, bytes: &[u8]) -> Result<Message, FrameError> {
        let now_ms = self.uptime_ms();
        self.on_frame_at(source, bytes, now_ms)
    }

    /// Handle one received frame with an explicit local receive time (ms)
    pub fn on_frame_at(
        &mut self,
        source: SourceAddress,
        bytes: &[u8],
        received_at_ms: u32,
    ) -> Result<Message, FrameError> {
        self.stats.frames_seen += 1;
        self.stats.last_source = Some(source);

        match td5_protocol::decode(bytes) {
            Ok((header, message)) => {
                let skipped = self.stats.loss.observe(header.sequence);
                if skipped > 0 {
                    debug!(%source, sequence = header.sequence, skipped, "Sequence gap");
                }
                if let Message::Status(status) = &message {
                    self.stats.bridge_report =
                        Some((status.last_error_code, status.total_packets_sent));
                }
                self.publisher.publish(&message, received_at_ms);
                trace!(%source, kind = %message.message_type(), sequence = header.sequence, "Frame accepted");
                Ok(message)
            }
            Err(err) => {
                self.publisher.record_error();
                trace!(%source, len = bytes.len(), error = %err, "Frame rejected");
                Err(err)
            }
        }
    }

    /// Diagnostics collected so far
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Clear the snapshot and diagnostics, as on re-initialization
    pub fn reset(&mut self) {
        self.publisher.reset();
        self.stats = ReceiverStats::default();
        self.started = Instant::now();
    }

    /// Milliseconds since this receiver started, wrapping like a u32 tick
    fn uptime_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_store::{snapshot_store, Snapshot};
    use td5_protocol::{
        encode_raw, xor_checksum, FrameBuilder, FuellingPayload, MessageType, StatusPayload,
    };

    const SRC: SourceAddress = SourceAddress([2, 0, 0, 0, 0, 1]);

    fn receiver() -> (FrameReceiver, SnapshotReader) {
        let (publisher, reader) = snapshot_store();
        (FrameReceiver::new(publisher), reader)
    }

    fn fuelling_frame() -> Vec<u8> {
        FrameBuilder::new()
            .build(
                5000,
                &Message::Fuelling(FuellingPayload {
                    vehicle_speed: 100,
                    engine_rpm: 2500,
                    injection_quantity: 1500,
                    manifold_air_flow: 300,
                    driver_demand: 8000,
                }),
            )
            .unwrap()
    }

    #[test]
    fn test_fuelling_round_trip() {
        let (mut rx, reader) = receiver();
        rx.on_frame_at(SRC, &fuelling_frame(), 250).unwrap();

        let s = reader.read();
        assert_eq!(
            (s.vehicle_speed, s.engine_rpm, s.injection_quantity, s.manifold_air_flow, s.driver_demand),
            (100, 2500, 1500, 300, 8000)
        );
        assert_eq!(s.packets_received, 1);
        assert_eq!(s.packet_errors, 0);
        assert_eq!(s.last_packet_time, 250);
        assert!(reader.is_ready());
    }

    #[test]
    fn test_short_frames_count_once() {
        for len in 0..9 {
            let (mut rx, reader) = receiver();
            let err = rx.on_frame_at(SRC, &vec![0xA5; len], 1).unwrap_err();
            assert!(matches!(err, FrameError::TooShort { .. }));
            assert_eq!(reader.read(), Snapshot { packet_errors: 1, ..Default::default() });
            assert!(!reader.is_ready());
        }
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let (mut rx, reader) = receiver();
        let mut bytes = fuelling_frame();
        bytes[10] ^= 0x01;
        let err = rx.on_frame_at(SRC, &bytes, 1).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
        assert_eq!(reader.read().vehicle_speed, 0);
        assert_eq!(reader.read().packet_errors, 1);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let (mut rx, reader) = receiver();
        let mut bytes = fuelling_frame();
        let last = bytes.len() - 1;
        bytes[7] = 12;
        bytes[last] = xor_checksum(&bytes[..last]);
        let err = rx.on_frame_at(SRC, &bytes, 1).unwrap_err();
        assert_eq!(err, FrameError::LengthMismatch { declared: 12, actual: 10 });
        assert_eq!(reader.read().packets_received, 0);
    }

    #[test]
    fn test_unknown_type_leaves_snapshot() {
        let (mut rx, reader) = receiver();
        let bytes = encode_raw(0, 0, 0x09, &[0u8; 10]).unwrap();
        let err = rx.on_frame_at(SRC, &bytes, 1).unwrap_err();
        assert_eq!(err, FrameError::UnknownMessageType(0x09));
        assert_eq!(reader.read(), Snapshot { packet_errors: 1, ..Default::default() });
        assert!(!reader.is_ready());
    }

    #[test]
    fn test_wrong_size_for_type_rejected() {
        let (mut rx, reader) = receiver();
        // consistent dataLength, but 4 bytes is the Inputs layout, not Fuelling
        let bytes = encode_raw(0, 0, MessageType::Fuelling.as_u8(), &[1, 2, 3, 4]).unwrap();
        assert!(matches!(
            rx.on_frame_at(SRC, &bytes, 1),
            Err(FrameError::PayloadSizeMismatch { .. })
        ));
        assert_eq!(reader.read().packet_errors, 1);
        assert_eq!(reader.read().vehicle_speed, 0);
    }

    #[test]
    fn test_status_keeps_ready_clear() {
        let (mut rx, reader) = receiver();
        let bytes = FrameBuilder::new()
            .build(
                0,
                &Message::Status(StatusPayload {
                    connection_state: 4,
                    last_error_code: 0x12,
                    connection_uptime: 61,
                    total_packets_sent: 900,
                }),
            )
            .unwrap();
        rx.on_frame_at(SRC, &bytes, 42).unwrap();

        let s = reader.read();
        assert_eq!(s.connection_state, 4);
        assert_eq!(s.connection_uptime, 61);
        assert_eq!(s.packets_received, 1);
        assert_eq!(s.last_packet_time, 42);
        assert!(!reader.is_ready());
        assert_eq!(rx.stats().bridge_report, Some((0x12, 900)));
    }

    #[test]
    fn test_mixed_stream_accounts_for_every_frame() {
        let (mut rx, reader) = receiver();
        let good = fuelling_frame();
        let mut bad = good.clone();
        bad[12] ^= 0xFF;
        let frames: Vec<Vec<u8>> = vec![
            good.clone(),
            bad,
            vec![1, 2, 3],
            encode_raw(0, 1, 0x00, &[]).unwrap(),
            good.clone(),
            good,
        ];

        for f in &frames {
            let _ = rx.on_frame_at(SRC, f, 0);
        }

        let s = reader.read();
        assert_eq!(s.packets_received, 3);
        assert_eq!(s.packet_errors, 3);
        assert_eq!(s.frames_seen(), frames.len() as u64);
        assert_eq!(rx.stats().frames_seen, frames.len() as u64);
    }

    #[test]
    fn test_loss_tracker() {
        let mut loss = LossTracker::default();
        assert_eq!(loss.observe(10), 0);
        assert_eq!(loss.observe(11), 0);
        assert_eq!(loss.observe(15), 3);
        assert_eq!(loss.observe(15), 0);
        assert_eq!(loss.observe(0), 0);
        assert_eq!(loss.lost(), 3);
        assert_eq!(loss.duplicates(), 1);
        assert_eq!(loss.resets(), 1);

        // wraps cleanly
        let mut loss = LossTracker::default();
        loss.observe(u16::MAX - 1);
        assert_eq!(loss.observe(1), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut rx, reader) = receiver();
        rx.on_frame_at(SRC, &fuelling_frame(), 5).unwrap();
        let _ = rx.on_frame_at(SRC, &[0u8; 2], 6);

        rx.reset();

        assert_eq!(reader.read(), Snapshot::default());
        assert_eq!(rx.stats(), ReceiverStats::default());
    }
}
