//! Tool registry: a fixed name → handler mapping with declared schemas.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Error;
use crate::tools::builtin::{FindRelevantFilesTool, LoadFilesTool, TemporalSearchTool};
use crate::tools::tool::{validate_tool_schema, Tool, ToolSchema};

/// Registry of the tools the model may call. Populated at startup and then
/// shared read-only; the loop never mutates it.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in analysis tools.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LoadFilesTool));
        registry.register(Arc::new(FindRelevantFilesTool));
        registry.register(Arc::new(TemporalSearchTool));
        registry
    }

    /// Register a tool, replacing any previous tool of the same name.
    /// Structural schema problems are logged, not fatal.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.parameters_schema();
        for problem in validate_tool_schema(&schema, tool.name()) {
            tracing::warn!("Tool schema problem: {}", problem);
        }
        tracing::debug!("Registered tool: {}", tool.name());
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Machine-readable schemas, sent verbatim to the gateway.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Execute a tool by name. An unknown name is fatal for the request.
    pub async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let tool = self.get(name).ok_or_else(|| Error::UnknownTool {
            name: name.to_string(),
        })?;
        Ok(tool.execute(args).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ToolError};
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes back the message parameter."
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string", "description": "Message to echo"}
                },
                "required": ["message"]
            })
        }

        async fn execute(
            &self,
            params: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            let message = crate::tools::require_str(&params, "message")?;
            Ok(serde_json::json!({"echo": message}))
        }
    }

    #[tokio::test]
    async fn execute_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let result = registry
            .execute("echo", serde_json::json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn unknown_tool_is_fatal() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool { .. }));
    }

    #[test]
    fn builtin_registry_exposes_three_schemas() {
        let registry = ToolRegistry::with_builtin_tools();
        assert_eq!(
            registry.list(),
            vec!["find_relevant_files", "load_files", "temporal_search"]
        );
        for schema in registry.schemas() {
            assert_eq!(schema.kind, "function");
            assert!(!schema.description.is_empty());
            assert!(
                validate_tool_schema(&schema.parameters, &schema.name).is_empty(),
                "builtin schema should validate"
            );
        }
    }
}
