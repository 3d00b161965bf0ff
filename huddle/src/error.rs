use std::borrow::Cow;

use serde_json::Value;
use thiserror::Error;

use crate::mcp::session::SessionError;

/// JSON-RPC code used for application errors raised on unknown resource URIs.
pub const RESOURCE_NOT_FOUND: i32 = -32002;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Protocol-level failures, each carried back to the client as a JSON-RPC error object.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    /// Detail is logged where the failure happened; clients only ever see the fixed text.
    #[error("Internal error")]
    Internal,

    #[error("{message}")]
    Application {
        code: i32,
        kind: Cow<'static, str>,
        message: String,
        data: Option<Value>,
    },
}

impl RpcError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) | Self::UnknownTool(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Internal => -32603,
            Self::Application { code, .. } => *code,
        }
    }

    pub fn resource_not_found(uri: &str) -> Self {
        Self::Application {
            code: RESOURCE_NOT_FOUND,
            kind: "resource_not_found".into(),
            message: format!("Resource not found: {}", uri),
            data: Some(serde_json::json!({ "uri": uri })),
        }
    }

    /// Value for the `data` member of the error object, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::Application { kind, data, .. } => {
                let mut object = match data {
                    Some(Value::Object(map)) => map.clone(),
                    Some(other) => {
                        let mut map = serde_json::Map::new();
                        map.insert("detail".to_string(), other.clone());
                        map
                    }
                    None => serde_json::Map::new(),
                };
                object.insert("type".to_string(), Value::String(kind.to_string()));
                Some(Value::Object(object))
            }
            _ => None,
        }
    }
}

/// Failures reported by a tool or resource provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{message}")]
    Application {
        code: i32,
        kind: Cow<'static, str>,
        message: String,
    },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Resource already registered: {0}")]
    DuplicateResource(String),
}
