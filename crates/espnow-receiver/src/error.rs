//! Transport Error Types

use std::net::SocketAddr;
use thiserror::Error;

/// Errors setting up a frame transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not bind the UDP socket
    #[error("Failed to bind UDP frame source on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Invalid source address text
    #[error("Invalid source address '{0}', expected six hex octets like 02:00:00:00:00:01")]
    InvalidSourceAddress(String),

    /// Other socket error
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}
