use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::mcp::registry::ToolProvider;
use crate::mcp::types::{CallToolResult, Tool};

/// Returns its `text` argument unchanged
pub struct EchoTool;

#[async_trait]
impl ToolProvider for EchoTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            "echo",
            json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to echo back"
                    }
                },
                "required": ["text"]
            }),
        )
        .with_title("Echo")
        .with_description("Echo the given text back as a single text block")
    }

    async fn invoke(&self, arguments: Value) -> Result<CallToolResult, ProviderError> {
        let text = arguments
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::InvalidArguments("Missing text".to_string()))?;

        Ok(CallToolResult::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo() {
        let result = EchoTool.invoke(json!({ "text": "hi" })).await.unwrap();
        assert_eq!(result, CallToolResult::text("hi"));
        assert!(result.structured_content.is_none());
    }

    #[tokio::test]
    async fn test_echo_requires_text() {
        let err = EchoTool.invoke(json!({ "text": 5 })).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidArguments(_)));
    }
}
