//! Datagram transmission
//!
//! `PacketSink` is the seam between packet construction and the network.

use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

use super::{WakeError, WakeResult};

/// Something that can transmit one datagram
#[async_trait]
pub trait PacketSink: Send + Sync {
    /// Send `payload` to `dest` as a single datagram and report how many bytes
    /// were written.
    ///
    /// Failures opening the socket map to `WakeError::Socket`, failures
    /// writing to it to `WakeError::ShortWrite`.
    async fn send(&self, dest: SocketAddr, payload: &[u8]) -> WakeResult<usize>;
}

/// Sends over a fresh UDP socket per datagram.
///
/// The socket lives only for the duration of `send` and is released when it
/// goes out of scope, whether or not the write succeeded.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpSink;

impl UdpSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PacketSink for UdpSink {
    async fn send(&self, dest: SocketAddr, payload: &[u8]) -> WakeResult<usize> {
        let local: SocketAddr = match dest {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local).await.map_err(WakeError::Socket)?;
        socket.set_broadcast(true).map_err(WakeError::Socket)?;
        socket.connect(dest).await.map_err(WakeError::Socket)?;

        tracing::debug!("Sending {} bytes to {}", payload.len(), dest);

        socket.send(payload).await.map_err(|e| WakeError::ShortWrite {
            written: 0,
            source: Some(e),
        })
    }
}
