//! Protocol codec for encoding/decoding messages
//!
//! Requests are written as one JSON object followed by a newline. Incoming
//! data is a stream of JSON objects with no framing of their own, so the
//! decoder pulls complete objects off the front of a buffer and reports when
//! it needs more bytes.

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use std::io;
use thiserror::Error;

use super::{Incoming, Params, Request};

/// Maximum size of a single incoming object (10 MB)
const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Message too large: {0} bytes (max: {1})")]
    MessageTooLarge(usize, usize),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a JSON-RPC message: {0}")]
    NotJsonRpc(String),
}

/// Encodes requests into the wire format and hands out correlation ids
pub struct Encoder {
    next_id: u64,
}

impl Encoder {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Build a request carrying the next correlation id
    pub fn request(&mut self, method: &str, params: Params) -> Request {
        let request = Request::new(self.next_id, method, params);
        self.next_id = self.next_id.wrapping_add(1);
        request
    }

    /// Encode a request into a buffer
    pub fn encode(&self, request: Request, buf: &mut BytesMut) -> Result<(), CodecError> {
        let payload = serde_json::to_vec(&request)?;
        buf.reserve(payload.len() + 1);
        buf.put_slice(&payload);
        buf.put_u8(b'\n');
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes messages from the wire format.
///
/// Objects are delimited by tracking bracket depth outside of strings. The
/// scan position survives between calls, so each byte of a partially
/// received object is looked at once no matter how many reads it takes to
/// arrive.
#[derive(Debug, Default)]
pub struct Decoder {
    /// Bytes of the current object already scanned
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to decode one message from the buffer
    /// Returns Ok(None) if more data is needed
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Incoming>, CodecError> {
        if self.scanned == 0 {
            let leading = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            buf.advance(leading);
            if buf.is_empty() {
                buf.clear();
                return Ok(None);
            }
            if !matches!(buf[0], b'{' | b'[') {
                return Err(Self::parse_error(buf));
            }
        }

        let end = match self.find_end(buf) {
            Some(end) => end,
            None => {
                if buf.len() > MAX_MESSAGE_SIZE {
                    return Err(CodecError::MessageTooLarge(buf.len(), MAX_MESSAGE_SIZE));
                }
                return Ok(None);
            }
        };

        let frame = buf.split_to(end);
        let value: Value = serde_json::from_slice(&frame)?;

        let text = value.to_string();
        match Incoming::from_value(value) {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(CodecError::Json(e)),
            None => Err(CodecError::NotJsonRpc(text)),
        }
    }

    /// Continue scanning where the last call stopped. Returns the length of
    /// the first complete object, resetting the scan state, or `None` once
    /// the whole buffer has been consumed.
    fn find_end(&mut self, buf: &[u8]) -> Option<usize> {
        for (offset, &byte) in buf[self.scanned..].iter().enumerate() {
            if self.in_string {
                match byte {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        let end = self.scanned + offset + 1;
                        *self = Self::default();
                        return Some(end);
                    }
                }
                _ => {}
            }
        }

        self.scanned = buf.len();
        None
    }

    /// serde_json's description of whatever sits at the front of `buf`
    fn parse_error(buf: &[u8]) -> CodecError {
        match serde_json::from_slice::<Value>(buf) {
            Err(e) => CodecError::Json(e),
            Ok(value) => CodecError::NotJsonRpc(value.to_string()),
        }
    }
}
