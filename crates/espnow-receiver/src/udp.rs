//! UDP Frame Transport
//!
//! Stands in for the radio: each datagram carries exactly one frame, and the
//! peer address becomes the frame's source.

use crate::error::TransportError;
use crate::source::{RawFrame, SourceAddress};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Receive buffer size; anything longer than a frame is truncated and then
/// fails validation
const RECV_BUFFER_SIZE: usize = 1024;

/// Bind a UDP socket and forward datagrams into a bounded channel
///
/// Returns the bound address (useful when binding port 0) and the channel.
pub async fn spawn_udp_source(
    bind_addr: SocketAddr,
    capacity: usize,
) -> Result<(SocketAddr, mpsc::Receiver<RawFrame>), TransportError> {
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: bind_addr,
            source,
        })?;
    let local_addr = socket.local_addr()?;
    info!(%local_addr, "UDP frame source bound");

    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, peer) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(error) => {
                    warn!(%error, "UDP receive error");
                    continue;
                }
            };

            let frame = RawFrame {
                source: SourceAddress::from(peer),
                data: buf[..len].to_vec(),
            };
            if tx.send(frame).await.is_err() {
                debug!("Frame receiver dropped, closing UDP source");
                break;
            }
        }
        info!(%local_addr, "UDP frame source stopped");
    });

    Ok((local_addr, rx))
}
