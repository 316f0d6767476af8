//! Tool trait and registry

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Output sent back for a function the assistant asked for but nobody registered
pub const INVALID_FUNCTION_OUTPUT: &str = "function invalid";

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Text returned to the assistant as the call's output
    pub output: String,
    /// Whether the output describes a failure
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            output: message.into(),
            is_error: true,
        }
    }
}

/// Trait for locally executed functions the assistant may call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name as declared on the assistant
    fn name(&self) -> &str;

    /// Tool description for the assistant
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments
    async fn execute(
        &self,
        tool_call_id: &str,
        arguments: serde_json::Value,
        cancel: CancellationToken,
    ) -> ToolResult;
}

/// Type alias for a boxed tool
pub type BoxedTool = Arc<dyn Tool>;

/// Name to tool lookup with cached argument validators
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
    schema_cache: HashMap<String, Arc<jsonschema::Validator>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool registered under the same name
    pub fn register(&mut self, tool: BoxedTool) {
        self.cache_tool_schema(&tool);
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, tool: BoxedTool) -> Self {
        self.register(tool);
        self
    }

    fn cache_tool_schema(&mut self, tool: &BoxedTool) {
        let schema = tool.parameters_schema();
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                self.schema_cache
                    .insert(tool.name().to_string(), Arc::new(validator));
            }
            Err(e) => {
                self.schema_cache.remove(tool.name());
                tracing::warn!(
                    "Invalid tool parameter schema for '{}', skipping validation: {}",
                    tool.name(),
                    e
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool. Never fails: unknown names and invalid arguments
    /// become error outputs.
    pub async fn execute(
        &self,
        tool_call_id: &str,
        name: &str,
        arguments: serde_json::Value,
        cancel: CancellationToken,
    ) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool_call_id, "assistant called unknown function '{}'", name);
            return ToolResult::error(INVALID_FUNCTION_OUTPUT);
        };

        if let Some(err) = self
            .schema_cache
            .get(name)
            .and_then(|validator| validate_with_validator(&arguments, validator))
        {
            tracing::warn!(tool_call_id, "rejected arguments for '{}': {}", name, err);
            return ToolResult::error(err);
        }

        tool.execute(tool_call_id, arguments, cancel).await
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!("Invalid arguments:\n{}", errors.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            _tool_call_id: &str,
            arguments: serde_json::Value,
            _cancel: CancellationToken,
        ) -> ToolResult {
            let text = arguments
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("(empty)");
            ToolResult::text(text)
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new().with(Arc::new(EchoTool))
    }

    #[tokio::test]
    async fn test_execute_registered_tool() {
        let result = registry()
            .execute(
                "call_1",
                "echo",
                serde_json::json!({"text": "hello"}),
                CancellationToken::new(),
            )
            .await;
        assert_eq!(result, ToolResult::text("hello"));
    }

    #[tokio::test]
    async fn test_unknown_function_is_rejected() {
        let result = registry()
            .execute(
                "call_1",
                "launch_rockets",
                serde_json::json!({}),
                CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert_eq!(result.output, INVALID_FUNCTION_OUTPUT);
    }

    #[tokio::test]
    async fn test_schema_violation_becomes_error_output() {
        let result = registry()
            .execute(
                "call_1",
                "echo",
                serde_json::json!({"text": 42}),
                CancellationToken::new(),
            )
            .await;
        assert!(result.is_error);
        assert!(result.output.starts_with("Invalid arguments"));
        assert!(result.output.contains("/text"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut reg = registry();
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.names(), vec!["echo"]);
        assert!(reg.get("echo").is_some());
    }
}
