//! Capability registry: tools and resources exposed to MCP clients

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{CallToolResult, Resource, ResourceContents, Tool};
use crate::error::{ProviderError, RegistryError};

/// A callable tool
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Descriptor returned by `tools/list`. `name` is the lookup key.
    fn descriptor(&self) -> Tool;

    /// Execute the tool with the client's `arguments` object
    async fn invoke(&self, arguments: Value) -> Result<CallToolResult, ProviderError>;
}

/// A readable resource
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Descriptor returned by `resources/list`. `uri` is the lookup key.
    fn descriptor(&self) -> Resource;

    async fn read(&self) -> Result<ResourceContents, ProviderError>;
}

struct Entry<D, P: ?Sized> {
    descriptor: D,
    provider: Arc<P>,
}

/// Registry of tools and resources.
///
/// Built once at startup and then shared behind an `Arc`; every method after
/// construction takes `&self`, so concurrent readers need no locking.
pub struct CapabilityRegistry {
    tools: Vec<Entry<Tool, dyn ToolProvider>>,
    tool_index: HashMap<String, usize>,
    resources: Vec<Entry<Resource, dyn ResourceProvider>>,
    resource_index: HashMap<String, usize>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            tool_index: HashMap::new(),
            resources: Vec::new(),
            resource_index: HashMap::new(),
        }
    }

    /// Register a tool. Names must be unique.
    pub fn register_tool(&mut self, provider: Arc<dyn ToolProvider>) -> Result<(), RegistryError> {
        let descriptor = provider.descriptor();
        if self.tool_index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }

        tracing::debug!("Registered tool {}", descriptor.name);
        self.tool_index
            .insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(Entry {
            descriptor,
            provider,
        });
        Ok(())
    }

    /// Register a resource. URIs must be unique.
    pub fn register_resource(
        &mut self,
        provider: Arc<dyn ResourceProvider>,
    ) -> Result<(), RegistryError> {
        let descriptor = provider.descriptor();
        if self.resource_index.contains_key(&descriptor.uri) {
            return Err(RegistryError::DuplicateResource(descriptor.uri));
        }

        tracing::debug!("Registered resource {}", descriptor.uri);
        self.resource_index
            .insert(descriptor.uri.clone(), self.resources.len());
        self.resources.push(Entry {
            descriptor,
            provider,
        });
        Ok(())
    }

    /// Tool descriptors in registration order
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Resource descriptors in registration order
    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Exact-match lookup by tool name
    pub fn resolve_tool(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
        self.tool_index
            .get(name)
            .map(|&i| self.tools[i].provider.clone())
    }

    /// Exact-match lookup by resource URI
    pub fn resolve_resource(&self, uri: &str) -> Option<Arc<dyn ResourceProvider>> {
        self.resource_index
            .get(uri)
            .map(|&i| self.resources[i].provider.clone())
    }

    /// Total number of registered capabilities
    pub fn len(&self) -> usize {
        self.tools.len() + self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty()
    }
}
