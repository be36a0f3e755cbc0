//! ESP-NOW Telemetry Receiver
//!
//! The delivery path that sits between a frame transport and the snapshot
//! store, plus two transports: a simulated Td5 ECU bridge and a UDP socket.

mod delivery;
mod error;
mod receiver;
mod simulator;
mod source;
mod udp;

pub use delivery::run_delivery;
pub use error::TransportError;
pub use receiver::{FrameReceiver, LossTracker, ReceiverStats};
pub use simulator::{spawn_simulator, SimulatedEcu, SimulatorConfig};
pub use source::{RawFrame, SourceAddress};
pub use udp::spawn_udp_source;
