//! Wake-on-LAN module
//!
//! Builds the 102-byte "magic packet" for a hardware address and broadcasts
//! it over UDP. Delivery is fire-and-forget: a sleeping machine cannot
//! acknowledge anything.

mod packet;
mod sink;

pub use packet::*;
pub use sink::*;

use std::net::SocketAddr;
use thiserror::Error;

/// Default broadcast destination
pub const DEFAULT_BROADCAST_ADDRESS: &str = "255.255.255.255";

/// Default Wake-on-LAN port (discard)
pub const DEFAULT_BROADCAST_PORT: u16 = 9;

/// Wake-on-LAN errors
#[derive(Error, Debug)]
pub enum WakeError {
    #[error("Invalid MAC address string: {0:?}")]
    InvalidAddress(String),

    #[error("Could not decode MAC address: {0}")]
    Decode(#[from] DecodeError),

    #[error("Could not resolve broadcast destination {destination}: {reason}")]
    Resolution { destination: String, reason: String },

    #[error("Could not open UDP socket: {0}")]
    Socket(#[source] std::io::Error),

    #[error("Short write: {written} of {} bytes sent", MAGIC_PACKET_LEN)]
    ShortWrite {
        written: usize,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl WakeError {
    /// The decode failure, if this is one
    #[cfg(test)]
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            WakeError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

pub type WakeResult<T> = Result<T, WakeError>;

/// Resolve `host:port` to a UDP destination
pub async fn resolve_broadcast(host: &str, port: &str) -> WakeResult<SocketAddr> {
    let destination = format!("{}:{}", host, port);
    let resolution = |reason: String| WakeError::Resolution {
        destination: destination.clone(),
        reason,
    };

    let port: u16 = port
        .parse()
        .map_err(|e: std::num::ParseIntError| resolution(format!("invalid port: {}", e)))?;

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| resolution(e.to_string()))?;

    addrs
        .next()
        .ok_or_else(|| resolution("no addresses found".to_string()))
}

/// Validate `hardware_address`, then broadcast its magic packet to
/// `broadcast_host:broadcast_port` over UDP.
pub async fn send_magic_packet(
    hardware_address: &str,
    broadcast_host: &str,
    broadcast_port: &str,
) -> WakeResult<()> {
    send_magic_packet_with(&UdpSink::new(), hardware_address, broadcast_host, broadcast_port).await
}

/// Like [`send_magic_packet`], transmitting through `sink`.
///
/// Nothing reaches the sink unless the address is valid and the destination
/// resolves.
pub async fn send_magic_packet_with<S: PacketSink + ?Sized>(
    sink: &S,
    hardware_address: &str,
    broadcast_host: &str,
    broadcast_port: &str,
) -> WakeResult<()> {
    let address = HardwareAddress::parse(hardware_address)?;
    let packet = MagicPacket::new(&address);
    let dest = resolve_broadcast(broadcast_host, broadcast_port).await?;

    let written = sink.send(dest, packet.as_bytes()).await?;
    if written != MAGIC_PACKET_LEN {
        return Err(WakeError::ShortWrite {
            written,
            source: None,
        });
    }

    tracing::info!("Magic packet for {} sent to {}", address, dest);
    Ok(())
}
