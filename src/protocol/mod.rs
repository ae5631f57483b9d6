//! Protocol module - Defines the JSON-RPC wire protocol spoken by the media center
//!
//! Requests are single JSON objects terminated by a newline. The media center
//! answers with a stream of concatenated JSON objects: responses carrying the
//! request id, interleaved with unsolicited notifications that carry none.

mod message;
mod codec;

pub use message::*;
pub use codec::*;

/// JSON-RPC protocol version sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Default port of the media center's JSON-RPC TCP endpoint
pub const DEFAULT_PORT: u16 = 9090;
