//! MCP JSON-RPC 2.0 handler

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::jsonrpc::{JsonRpcRequest, JsonRpcResponse, RequestId};
use super::registry::CapabilityRegistry;
use super::session::Session;
use super::types::{
    negotiate_protocol_version, CallToolParams, Implementation, InitializeParams,
    InitializeResult, ListResourcesResult, ListToolsResult, ReadResourceParams,
    ReadResourceResult, ServerCapabilities,
};
use crate::error::{ProviderError, RpcError};

/// Methods the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Initialize,
    Initialized,
    Ping,
    ListTools,
    CallTool,
    ListResources,
    ReadResource,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "notifications/initialized" => Some(Self::Initialized),
            "ping" => Some(Self::Ping),
            "tools/list" => Some(Self::ListTools),
            "tools/call" => Some(Self::CallTool),
            "resources/list" => Some(Self::ListResources),
            "resources/read" => Some(Self::ReadResource),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "notifications/initialized",
            Self::Ping => "ping",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::ListResources => "resources/list",
            Self::ReadResource => "resources/read",
        }
    }
}

/// MCP protocol handler
pub struct McpHandler {
    registry: Arc<CapabilityRegistry>,
    server_info: Implementation,
    instructions: Option<String>,
}

impl McpHandler {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        server_info: Implementation,
        instructions: Option<String>,
    ) -> Self {
        Self {
            registry,
            server_info,
            instructions,
        }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Handle a JSON-RPC request in the context of `session`.
    ///
    /// Notifications are executed like any other request but yield `None`.
    pub async fn handle(&self, req: JsonRpcRequest, session: &Session) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            id, method, params, ..
        } = req;

        let (label, outcome) = match Method::parse(&method) {
            Some(m) => {
                tracing::debug!(method = m.as_str(), session_id = session.id(), "Dispatching");
                (m.as_str(), self.dispatch(m, params, session).await)
            }
            None => {
                tracing::warn!("Method not found: {}", method);
                ("unknown", Err(RpcError::MethodNotFound(method)))
            }
        };

        crate::metrics::record_rpc_request(label, if outcome.is_ok() { "ok" } else { "error" });

        let id = id?;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::error(id, err),
        })
    }

    async fn dispatch(
        &self,
        method: Method,
        params: Option<Value>,
        session: &Session,
    ) -> Result<Value, RpcError> {
        match method {
            Method::Initialize => self.handle_initialize(params, session),
            Method::Initialized => {
                session.mark_initialized();
                Ok(json!({}))
            }
            Method::Ping => Ok(json!({})),
            Method::ListTools => to_value(ListToolsResult {
                tools: self.registry.list_tools(),
            }),
            Method::CallTool => self.handle_tools_call(params).await,
            Method::ListResources => to_value(ListResourcesResult {
                resources: self.registry.list_resources(),
            }),
            Method::ReadResource => self.handle_resources_read(params).await,
        }
    }

    fn handle_initialize(&self, params: Option<Value>, session: &Session) -> Result<Value, RpcError> {
        let params: InitializeParams = match params {
            Some(p) => parse_params(p)?,
            None => InitializeParams::default(),
        };

        let version = negotiate_protocol_version(params.protocol_version.as_deref());
        session.record_initialize(params.client_info, version);

        to_value(InitializeResult {
            protocol_version: version.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: CallToolParams =
            parse_params(params.ok_or(RpcError::InvalidParams("Missing params".into()))?)?;

        let tool = self
            .registry
            .resolve_tool(&params.name)
            .ok_or_else(|| RpcError::UnknownTool(params.name.clone()))?;

        let arguments = match params.arguments {
            Value::Null => json!({}),
            args => args,
        };

        let result = AssertUnwindSafe(tool.invoke(arguments)).catch_unwind().await;
        match result {
            Ok(Ok(result)) => to_value(result),
            Ok(Err(e)) => Err(provider_error("tool", &params.name, e)),
            Err(_) => {
                tracing::error!(tool = %params.name, "Tool panicked");
                Err(RpcError::Internal)
            }
        }
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: ReadResourceParams =
            parse_params(params.ok_or(RpcError::InvalidParams("Missing params".into()))?)?;

        let resource = self
            .registry
            .resolve_resource(&params.uri)
            .ok_or_else(|| RpcError::resource_not_found(&params.uri))?;

        let result = AssertUnwindSafe(resource.read()).catch_unwind().await;
        match result {
            Ok(Ok(contents)) => to_value(ReadResourceResult {
                contents: vec![contents],
            }),
            Ok(Err(e)) => Err(provider_error("resource", &params.uri, e)),
            Err(_) => {
                tracing::error!(uri = %params.uri, "Resource provider panicked");
                Err(RpcError::Internal)
            }
        }
    }
}

/// Map a provider failure to what the client is allowed to see
fn provider_error(kind: &str, target: &str, err: ProviderError) -> RpcError {
    match err {
        ProviderError::InvalidArguments(msg) => RpcError::InvalidParams(msg.into()),
        ProviderError::Application {
            code,
            kind: app_kind,
            message,
        } => RpcError::Application {
            code,
            kind: app_kind,
            message,
            data: None,
        },
        ProviderError::Failed(e) => {
            tracing::error!("{} {} failed: {:#}", kind, target, e);
            RpcError::Internal
        }
    }
}

/// MCP methods take named params only; serde would otherwise accept an array positionally
fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    if !params.is_object() {
        return Err(RpcError::InvalidParams("params must be an object".into()));
    }
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string().into()))
}

fn to_value<T: serde::Serialize>(payload: T) -> Result<Value, RpcError> {
    serde_json::to_value(payload).map_err(|e| {
        tracing::error!("Failed to serialize result: {}", e);
        RpcError::Internal
    })
}

/// Response id for a request that never reached the dispatcher
pub(crate) fn orphan_error(err: impl Into<RpcError>) -> JsonRpcResponse {
    JsonRpcResponse::error(RequestId::Null, err.into())
}
