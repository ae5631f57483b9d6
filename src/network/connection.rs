//! Connection handling
//!
//! Wraps a TCP stream with the JSON-RPC codec:
//! - Request encoding
//! - Incremental decoding of the incoming object stream
//! - Byte/message statistics

use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::{CodecError, Decoder, Encoder, Incoming, Params};

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Requests sent
    pub messages_sent: u64,
    /// Responses and notifications received
    pub messages_received: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
}

/// A framed connection to a JSON-RPC endpoint
pub struct Connection {
    /// Remote peer address
    remote_addr: SocketAddr,
    /// The TCP stream
    stream: TcpStream,
    /// Protocol encoder
    encoder: Encoder,
    /// Protocol decoder
    decoder: Decoder,
    /// Read buffer
    read_buf: BytesMut,
    /// Write buffer
    write_buf: BytesMut,
    /// Statistics
    stats: ConnectionStats,
}

impl Connection {
    /// Create a new connection from an established TCP stream
    pub fn new(stream: TcpStream, remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr,
            stream,
            encoder: Encoder::new(),
            decoder: Decoder::new(),
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::with_capacity(4096),
            stats: ConnectionStats::default(),
        }
    }

    /// Get the remote address
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Get connection statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Send a request, returning the correlation id it was given
    pub async fn send(&mut self, method: &str, params: Params) -> Result<u64, CodecError> {
        let request = self.encoder.request(method, params);
        let id = request.id;

        self.write_buf.clear();
        self.encoder.encode(request, &mut self.write_buf)?;

        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;

        self.stats.messages_sent += 1;
        self.stats.bytes_sent += self.write_buf.len() as u64;

        Ok(id)
    }

    /// Receive the next message (returns None if the peer closed the stream)
    pub async fn recv(&mut self) -> Result<Option<Incoming>, CodecError> {
        loop {
            if let Some(message) = self.decoder.decode(&mut self.read_buf)? {
                self.stats.messages_received += 1;
                return Ok(Some(message));
            }

            let mut buf = [0u8; 4096];
            let n = self.stream.read(&mut buf).await?;

            if n == 0 {
                return Ok(None);
            }

            self.read_buf.extend_from_slice(&buf[..n]);
            self.stats.bytes_received += n as u64;
        }
    }

    /// Shut down the write half and release the stream
    pub async fn close(mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}
