//! Protocol message definitions
//!
//! Requests going out, and responses or notifications coming back.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::JSONRPC_VERSION;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Null,
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// Named parameters of a call, kept sorted so encoding is deterministic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outgoing JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Params,
    pub id: u64,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Params) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
            id,
        }
    }
}

/// Error object returned by the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Response to a request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    /// Correlation id; `null` when the server could not read the request's id
    #[serde(default)]
    pub id: Option<u64>,
    /// Present whenever the key is present, even if its value is `null`
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Unsolicited message pushed by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Any message the server may send
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Response(Response),
    Notification(Notification),
}

impl Incoming {
    /// Classify a decoded JSON object.
    ///
    /// Objects with an `id` key are responses, objects with a `method` key and
    /// no `id` are notifications. Anything else is `None`.
    pub fn from_value(value: Value) -> Option<Result<Self, serde_json::Error>> {
        let obj = value.as_object()?;
        if obj.contains_key("id") {
            Some(serde_json::from_value(value).map(Incoming::Response))
        } else if obj.contains_key("method") {
            Some(serde_json::from_value(value).map(Incoming::Notification))
        } else {
            None
        }
    }
}

/// Decoded result of a call.
///
/// The full JSON value is kept; `Display` renders strings without quotes and
/// everything else as compact JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcValue(Value);

impl RpcValue {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[cfg(test)]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for RpcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_as_jsonrpc() {
        let params = Params::new()
            .with("title", "Hello")
            .with("volume", 42i64)
            .with("image", None::<String>);
        let request = Request::new(7, "GUI.ShowNotification", params);

        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            json!({
                "jsonrpc": "2.0",
                "method": "GUI.ShowNotification",
                "params": {"image": null, "title": "Hello", "volume": 42},
                "id": 7
            })
        );
    }

    #[test]
    fn test_empty_params_encode_as_object() {
        let request = Request::new(0, "JSONRPC.Ping", Params::new());
        let text = serde_json::to_string(&request).unwrap();
        assert!(text.contains("\"params\":{}"));
    }

    #[test]
    fn test_classify_response_and_notification() {
        let response = Incoming::from_value(json!({"jsonrpc": "2.0", "id": 3, "result": "pong"}));
        match response {
            Some(Ok(Incoming::Response(r))) => {
                assert_eq!(r.id, Some(3));
                assert_eq!(r.result, Some(json!("pong")));
                assert!(r.error.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }

        let notification = Incoming::from_value(json!({
            "jsonrpc": "2.0",
            "method": "Player.OnPlay",
            "params": {"sender": "xbmc"}
        }));
        assert!(matches!(
            notification,
            Some(Ok(Incoming::Notification(Notification { ref method, .. }))) if method == "Player.OnPlay"
        ));

        assert!(Incoming::from_value(json!({"jsonrpc": "2.0"})).is_none());
        assert!(Incoming::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_null_result_is_present() {
        let r: Response = serde_json::from_value(json!({"id": 1, "result": null})).unwrap();
        assert_eq!(r.result, Some(Value::Null));

        let r: Response = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(r.result, None);
    }

    #[test]
    fn test_error_response() {
        let r: Response = serde_json::from_value(json!({
            "id": 2,
            "error": {"code": -32601, "message": "Method not found."}
        }))
        .unwrap();
        let err = r.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.to_string(), "Method not found. (code -32601)");
    }

    #[test]
    fn test_rpc_value_display() {
        assert_eq!(RpcValue::new(json!("OK")).to_string(), "OK");
        assert_eq!(RpcValue::new(json!(true)).to_string(), "true");
        assert_eq!(RpcValue::new(json!({"volume": 50})).to_string(), "{\"volume\":50}");
    }
}
