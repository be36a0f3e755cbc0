//! Async Frame Delivery
//!
//! Drains a transport channel into the receiver, one frame at a time in
//! arrival order. Each frame is fully handled before the next is taken.

use crate::receiver::FrameReceiver;
use crate::source::RawFrame;
use tokio::sync::mpsc;
use tracing::info;

/// Feed frames from `frames` into `receiver` until every sender is gone
///
/// Returns the receiver so its diagnostics can be inspected.
pub async fn run_delivery(
    mut receiver: FrameReceiver,
    mut frames: mpsc::Receiver<RawFrame>,
) -> FrameReceiver {
    info!("Frame delivery started");

    while let Some(frame) = frames.recv().await {
        // Rejections are already counted in the snapshot
        let _ = receiver.on_frame(frame.source, &frame.data);
    }

    let stats = receiver.stats();
    info!(
        frames = stats.frames_seen,
        lost = stats.loss.lost(),
        resets = stats.loss.resets(),
        "Frame delivery stopped"
    );
    receiver
}
