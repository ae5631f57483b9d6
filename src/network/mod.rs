//! Network module - Handles the TCP connection to the media center
//!
//! Provides:
//! - `RpcChannel` for one request/response exchange per invocation
//! - Framed connection handling underneath it

mod channel;
mod connection;

pub use channel::*;

use std::net::SocketAddr;

/// Configuration for network operations
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
        }
    }
}

impl NetworkConfig {
    pub fn new(connect_timeout_ms: u64) -> Self {
        Self { connect_timeout_ms }
    }
}

/// Resolve a hostname to a socket address
pub async fn resolve_host(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    use tokio::net::lookup_host;

    let addr_string = format!("{}:{}", host, port);
    let mut addrs = lookup_host(&addr_string).await?;

    addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not resolve host: {}", host),
        )
    })
}
