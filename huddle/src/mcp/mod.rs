//! MCP (Model Context Protocol) over Streamable HTTP
//!
//! - `jsonrpc`: JSON-RPC 2.0 envelope codec
//! - `registry`: tool and resource providers
//! - `session`: the single session slot and its push queue
//! - `handler`: method dispatch

pub mod handler;
pub mod jsonrpc;
pub mod registry;
pub mod session;
pub mod types;

pub use handler::McpHandler;
pub use jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use registry::{CapabilityRegistry, ResourceProvider, ToolProvider};
pub use session::{Session, SessionManager, SESSION_HEADER};
