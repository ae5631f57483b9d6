//! RPC channel
//!
//! Owns one TCP connection to the media center and performs request/response
//! exchanges on it. The channel is opened once per invocation and released
//! either by `close` or, on early return, when it is dropped.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;

use super::connection::Connection;
use super::NetworkConfig;
use crate::protocol::{CodecError, Incoming, Params, RpcValue};

/// Errors establishing the connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Could not resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not connect to {addr}: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {host}:{port} timed out after {timeout_ms} ms")]
    Timeout { host: String, port: u16, timeout_ms: u64 },
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors during a call
#[derive(Error, Debug)]
pub enum CallError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Codec(CodecError),

    #[error("Connection closed before a response to request {id} arrived")]
    Closed { id: u64 },

    #[error("Response to request {id} has neither result nor error")]
    Malformed { id: u64 },

    #[error("Remote error: {message} (code {code})")]
    Remote { code: i64, message: String },
}

impl From<CodecError> for CallError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Io(io) => CallError::Io(io),
            other => CallError::Codec(other),
        }
    }
}

pub type CallResult<T> = Result<T, CallError>;

/// A single connection to a JSON-RPC endpoint
pub struct RpcChannel {
    conn: Connection,
}

impl RpcChannel {
    /// Open a connection to `host:port`. Does not retry.
    pub async fn connect(host: &str, port: u16, config: &NetworkConfig) -> ConnectionResult<Self> {
        let timeout = Duration::from_millis(config.connect_timeout_ms);

        let attempt = async {
            let addr = super::resolve_host(host, port)
                .await
                .map_err(|source| ConnectionError::Resolve {
                    host: host.to_string(),
                    port,
                    source,
                })?;

            tracing::debug!("Connecting to {}", addr);

            let stream = TcpStream::connect(addr)
                .await
                .map_err(|source| ConnectionError::Io { addr, source })?;

            Ok::<_, ConnectionError>((stream, addr))
        };

        let (stream, addr) = match tokio::time::timeout(timeout, attempt).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConnectionError::Timeout {
                    host: host.to_string(),
                    port,
                    timeout_ms: config.connect_timeout_ms,
                })
            }
        };

        tracing::info!("Connected to {}:{}", host, port);

        Ok(Self {
            conn: Connection::new(stream, addr),
        })
    }

    /// Call `method` with `params` and wait for its response.
    ///
    /// Notifications and responses to other ids received in the meantime are
    /// skipped.
    pub async fn invoke(&mut self, method: &str, params: Params) -> CallResult<RpcValue> {
        let id = self.conn.send(method, params).await?;
        tracing::debug!("Sent {} (id {})", method, id);

        loop {
            let message = match self.conn.recv().await? {
                Some(message) => message,
                None => return Err(CallError::Closed { id }),
            };

            let response = match message {
                Incoming::Notification(n) => {
                    tracing::debug!("Skipping notification {}", n.method);
                    continue;
                }
                Incoming::Response(r) => r,
            };

            // A null id is how the server answers a request it could not parse
            if response.id.is_some_and(|rid| rid != id) {
                tracing::debug!("Skipping response to request {:?}", response.id);
                continue;
            }

            if let Some(err) = response.error {
                return Err(CallError::Remote {
                    code: err.code,
                    message: err.message,
                });
            }

            return response
                .result
                .map(RpcValue::new)
                .ok_or(CallError::Malformed { id });
        }
    }

    /// Release the connection
    pub async fn close(self) {
        let addr = self.conn.remote_addr();
        let stats = self.conn.stats().clone();

        if let Err(e) = self.conn.close().await {
            tracing::debug!("Shutdown of {} failed: {}", addr, e);
        }

        tracing::debug!(
            "Closed connection to {} ({} messages / {} bytes sent, {} messages / {} bytes received)",
            addr,
            stats.messages_sent,
            stats.bytes_sent,
            stats.messages_received,
            stats.bytes_received
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Accept one connection, read one request line, and answer with whatever
    /// `reply` produces for it. The connection is closed afterwards.
    async fn fake_media_center<F>(reply: F) -> (SocketAddr, tokio::task::JoinHandle<Value>)
    where
        F: FnOnce(&Value) -> Vec<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();

            for chunk in reply(&request) {
                write_half.write_all(chunk.as_bytes()).await.unwrap();
            }
            write_half.shutdown().await.unwrap();
            request
        });

        (addr, handle)
    }

    async fn open(addr: SocketAddr) -> RpcChannel {
        RpcChannel::connect("127.0.0.1", addr.port(), &NetworkConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (addr, server) = fake_media_center(|req| {
            vec![json!({"id": req["id"], "jsonrpc": "2.0", "result": "pong"}).to_string()]
        })
        .await;

        let mut channel = open(addr).await;
        let result = channel.invoke("JSONRPC.Ping", Params::new()).await.unwrap();
        channel.close().await;

        assert_eq!(result.to_string(), "pong");

        let request = server.await.unwrap();
        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["method"], "JSONRPC.Ping");
        assert_eq!(request["params"], json!({}));
        assert!(request["id"].is_u64());
    }

    #[tokio::test]
    async fn test_params_are_sent() {
        let (addr, server) = fake_media_center(|req| {
            vec![json!({"id": req["id"], "jsonrpc": "2.0", "result": "OK"}).to_string()]
        })
        .await;

        let mut channel = open(addr).await;
        let params = Params::new().with("title", "Hi").with("message", "there");
        channel.invoke("GUI.ShowNotification", params).await.unwrap();
        channel.close().await;

        let request = server.await.unwrap();
        assert_eq!(request["params"], json!({"title": "Hi", "message": "there"}));
    }

    #[tokio::test]
    async fn test_skips_notifications_and_stale_responses() {
        let (addr, _server) = fake_media_center(|req| {
            let id = req["id"].as_u64().unwrap();
            vec![
                json!({"jsonrpc": "2.0", "method": "VideoLibrary.OnScanStarted", "params": {"data": null}})
                    .to_string(),
                json!({"id": id + 100, "jsonrpc": "2.0", "result": "stale"}).to_string(),
                // Split the real answer across two writes
                format!("{{\"id\":{},\"jsonrpc\":\"2.0\",", id),
                "\"result\":{\"volume\":40}}".to_string(),
            ]
        })
        .await;

        let mut channel = open(addr).await;
        let result = channel
            .invoke("Application.SetVolume", Params::new().with("volume", 40i64))
            .await
            .unwrap();
        channel.close().await;

        assert_eq!(result.as_value(), &json!({"volume": 40}));
        assert_eq!(result.to_string(), "{\"volume\":40}");
    }

    #[tokio::test]
    async fn test_remote_error() {
        let (addr, _server) = fake_media_center(|req| {
            vec![json!({
                "id": req["id"],
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found."}
            })
            .to_string()]
        })
        .await;

        let mut channel = open(addr).await;
        let err = channel.invoke("No.Such", Params::new()).await.unwrap_err();
        channel.close().await;

        match err {
            CallError::Remote { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found.");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_closed_mid_call() {
        let (addr, _server) = fake_media_center(|_| Vec::new()).await;

        let mut channel = open(addr).await;
        let err = channel.invoke("JSONRPC.Ping", Params::new()).await.unwrap_err();
        channel.close().await;

        assert!(matches!(err, CallError::Closed { .. }));
    }

    #[tokio::test]
    async fn test_response_without_result() {
        let (addr, _server) =
            fake_media_center(|req| vec![json!({"id": req["id"], "jsonrpc": "2.0"}).to_string()]).await;

        let mut channel = open(addr).await;
        let err = channel.invoke("JSONRPC.Ping", Params::new()).await.unwrap_err();
        channel.close().await;

        assert!(matches!(err, CallError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let (addr, _server) = fake_media_center(|_| vec!["not json at all".to_string()]).await;

        let mut channel = open(addr).await;
        let err = channel.invoke("JSONRPC.Ping", Params::new()).await.unwrap_err();
        channel.close().await;

        assert!(matches!(err, CallError::Codec(_)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = RpcChannel::connect("127.0.0.1", port, &NetworkConfig::default()).await;
        assert!(matches!(result, Err(ConnectionError::Io { .. })));
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        // A listener that never accepts stops answering once its backlog is full
        let socket = tokio::net::TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(1).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut held = Vec::new();
        for _ in 0..16 {
            match tokio::time::timeout(Duration::from_millis(100), TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => held.push(stream),
                Ok(Err(e)) => panic!("connect failed: {}", e),
                Err(_) => break,
            }
        }

        let result = RpcChannel::connect("127.0.0.1", addr.port(), &NetworkConfig::new(200)).await;
        match result {
            Err(ConnectionError::Timeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 200),
            Err(other) => panic!("unexpected: {}", other),
            Ok(_) => panic!("connected to a full backlog"),
        }
        drop(held);
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let result = RpcChannel::connect("media\0center", 9090, &NetworkConfig::default()).await;
        match result {
            Err(ConnectionError::Resolve { host, port, .. }) => {
                assert_eq!(host, "media\0center");
                assert_eq!(port, 9090);
            }
            Err(other) => panic!("unexpected: {}", other),
            Ok(_) => panic!("resolved a host containing a NUL byte"),
        }
    }
}
