//! JSON-RPC 2.0 envelope codec
//!
//! Decoding works on a `serde_json::Value` rather than a derived struct so the
//! codec can tell an absent `id` (a notification) apart from `"id": null`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::RpcError;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Written when a response cannot be serialized; always a valid envelope.
const FALLBACK_ENVELOPE: &[u8] =
    br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

/// Request identifier. Opaque: only ever echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(serde_json::Number),
    String(String),
    Null,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for RequestId {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// JSON-RPC request. `id: None` marks a notification; `Some(RequestId::Null)` is an explicit null id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: None,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for JsonRpcError {
    fn from(err: RpcError) -> Self {
        Self {
            code: err.code(),
            data: err.data(),
            message: err.to_string(),
        }
    }
}

/// JSON-RPC response. Constructors guarantee exactly one of `result` / `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: RequestId, error: impl Into<JsonRpcError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Server-initiated message without an id, pushed over the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),
}

impl From<DecodeError> for RpcError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Parse(detail) => RpcError::Parse(detail),
            DecodeError::InvalidRequest(detail) => RpcError::InvalidRequest(detail),
        }
    }
}

impl From<DecodeError> for JsonRpcError {
    fn from(err: DecodeError) -> Self {
        RpcError::from(err).into()
    }
}

/// A decoded POST body.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Single(JsonRpcRequest),
    /// Each element decodes independently; order matches the wire.
    Batch(Vec<Result<JsonRpcRequest, DecodeError>>),
}

/// Decode a request body: a single envelope or a non-empty batch array.
pub fn decode(bytes: &[u8]) -> Result<Incoming, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Parse(e.to_string()))?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(DecodeError::InvalidRequest("empty batch".into()));
            }
            Ok(Incoming::Batch(
                items.into_iter().map(decode_request).collect(),
            ))
        }
        other => decode_request(other).map(Incoming::Single),
    }
}

/// Validate the shape of one envelope.
pub fn decode_request(value: Value) -> Result<JsonRpcRequest, DecodeError> {
    let Value::Object(mut object) = value else {
        return Err(DecodeError::InvalidRequest(
            "request must be a JSON object".into(),
        ));
    };

    match object.remove("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(_) => {
            return Err(DecodeError::InvalidRequest(
                "unsupported jsonrpc version".into(),
            ))
        }
        None => return Err(DecodeError::InvalidRequest("missing jsonrpc version".into())),
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        Some(_) => return Err(DecodeError::InvalidRequest("method must be a string".into())),
        None => return Err(DecodeError::InvalidRequest("missing method".into())),
    };

    let id = decode_id(&mut object)?;

    let params = match object.remove("params") {
        None | Some(Value::Null) => None,
        Some(params @ (Value::Object(_) | Value::Array(_))) => Some(params),
        Some(_) => {
            return Err(DecodeError::InvalidRequest(
                "params must be an object or array".into(),
            ))
        }
    };

    Ok(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.into(),
        id,
        method,
        params,
    })
}

fn decode_id(object: &mut Map<String, Value>) -> Result<Option<RequestId>, DecodeError> {
    match object.remove("id") {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(RequestId::Null)),
        Some(Value::Number(n)) => Ok(Some(RequestId::Number(n))),
        Some(Value::String(s)) => Ok(Some(RequestId::String(s))),
        Some(_) => Err(DecodeError::InvalidRequest(
            "id must be a string, number or null".into(),
        )),
    }
}

pub fn encode(response: &JsonRpcResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize JSON-RPC response: {}", e);
        FALLBACK_ENVELOPE.to_vec()
    })
}

pub fn encode_batch(responses: &[JsonRpcResponse]) -> Vec<u8> {
    serde_json::to_vec(responses).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize JSON-RPC batch: {}", e);
        FALLBACK_ENVELOPE.to_vec()
    })
}

pub fn encode_result(id: RequestId, payload: Value) -> Vec<u8> {
    encode(&JsonRpcResponse::success(id, payload))
}

pub fn encode_error(id: RequestId, code: i32, message: impl Into<String>) -> Vec<u8> {
    encode(&JsonRpcResponse::error(
        id,
        JsonRpcError {
            code,
            message: message.into(),
            data: None,
        },
    ))
}
