//! Tool trait and schema types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// A tool's machine-readable schema, in the wire shape the gateway expects
/// for function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: "function".to_string(),
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Trait for tools the model may request.
///
/// Handlers are pure functions from validated arguments to a
/// JSON-serializable result. They must be idempotent-safe: the loop delivers
/// at-least-once and never deduplicates repeated calls. Failures should be
/// reported as error-shaped results where possible; a returned [`ToolError`]
/// aborts the whole request.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Schema sent verbatim to the gateway.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            kind: "function".to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Extract a required string parameter.
pub fn require_str<'a>(params: &'a serde_json::Value, name: &str) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing '{name}' parameter")))
}

/// Lenient structural validation of a tool's parameter schema, run at
/// registration time. Returns a list of problems; empty means valid.
///
/// Rules: the top level must be `"type": "object"` with an object
/// `"properties"`; every `"required"` key must exist in `"properties"`;
/// nested objects are checked recursively; array properties need `"items"`.
/// Properties without a `"type"` are allowed (freeform values).
pub fn validate_tool_schema(schema: &serde_json::Value, path: &str) -> Vec<String> {
    let mut errors = Vec::new();

    match schema.get("type").and_then(|t| t.as_str()) {
        Some("object") => {}
        Some(other) => {
            errors.push(format!("{path}: expected type \"object\", got \"{other}\""));
            return errors;
        }
        None => {
            errors.push(format!("{path}: missing \"type\": \"object\""));
            return errors;
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        errors.push(format!("{path}: missing or non-object \"properties\""));
        return errors;
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for req in required.iter().filter_map(|r| r.as_str()) {
            if !properties.contains_key(req) {
                errors.push(format!(
                    "{path}: required key \"{req}\" not found in properties"
                ));
            }
        }
    }

    for (key, prop) in properties {
        let prop_path = format!("{path}.{key}");
        match prop.get("type").and_then(|t| t.as_str()) {
            Some("object") => errors.extend(validate_tool_schema(prop, &prop_path)),
            Some("array") => match prop.get("items") {
                Some(items) if items.get("type").and_then(|t| t.as_str()) == Some("object") => {
                    errors.extend(validate_tool_schema(items, &format!("{prop_path}.items")));
                }
                Some(_) => {}
                None => errors.push(format!("{prop_path}: array property missing \"items\"")),
            },
            _ => {}
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_serializes_as_function() {
        let schema = ToolSchema::new("echo", "Echo back the input.");
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["name"], "echo");
        assert_eq!(value["parameters"]["type"], "object");
    }

    #[test]
    fn require_str_errors() {
        let params = serde_json::json!({"query": 42});
        assert!(require_str(&params, "query").is_err());
        assert!(require_str(&params, "missing").is_err());
        let ok = serde_json::json!({"query": "scores"});
        assert_eq!(require_str(&ok, "query").unwrap(), "scores");
    }

    #[test]
    fn validate_accepts_well_formed_schema() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"}
            },
            "required": ["query"]
        });
        assert!(validate_tool_schema(&schema, "test").is_empty());
    }

    #[test]
    fn validate_flags_orphan_required_key() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["a", "b"]
        });
        let errors = validate_tool_schema(&schema, "test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("\"b\""));
    }

    #[test]
    fn validate_flags_array_without_items() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"tags": {"type": "array"}}
        });
        let errors = validate_tool_schema(&schema, "test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("items"));
    }

    #[test]
    fn validate_flags_non_object_top_level() {
        let errors = validate_tool_schema(&serde_json::json!({"type": "string"}), "t");
        assert_eq!(errors.len(), 1);
    }
}
