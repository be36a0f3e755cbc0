//! Frame Source Identity

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Hardware address of the transmitting bridge
///
/// Carried alongside each frame for diagnostics only; decoding ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceAddress(pub [u8; 6]);

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for SourceAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidSourceAddress(s.to_string());
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for SourceAddress {
    type Error = TransportError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SourceAddress> for String {
    fn from(addr: SourceAddress) -> Self {
        addr.to_string()
    }
}

impl From<SocketAddr> for SourceAddress {
    /// Peer IPv4 octets followed by the port; IPv6 peers use their last
    /// four octets.
    fn from(addr: SocketAddr) -> Self {
        let ip = match addr.ip() {
            IpAddr::V4(v4) => v4.octets(),
            IpAddr::V6(v6) => {
                let o = v6.octets();
                [o[12], o[13], o[14], o[15]]
            }
        };
        let [hi, lo] = addr.port().to_be_bytes();
        Self([ip[0], ip[1], ip[2], ip[3], hi, lo])
    }
}

/// One frame as handed over by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub source: SourceAddress,
    pub data: Vec<u8>,
}
