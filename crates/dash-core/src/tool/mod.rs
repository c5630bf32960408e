//! The tool contract: a named, schema-validated capability the model can
//! invoke. Concrete tools live with their backend clients; this module only
//! defines the seam and the registry dispatching through it.

pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use registry::{Invocation, RegistryError, SharedTool, ToolRegistry};

#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Cancelled")]
    Cancelled,
}

/// What a tool hands back: text for the model plus an optional structured
/// artifact (e.g. a dashboard panel definition) carried alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Value>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(content: impl Into<String>, artifact: Value) -> Self {
        Self {
            content: content.into(),
            artifact: Some(artifact),
        }
    }
}

/// Schema advertised to the LLM, in the function-calling shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    /// Tools with observable side effects (navigation) return true and must
    /// additionally receive explicit confirmation in their input.
    fn requires_confirmation(&self) -> bool {
        false
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError>;

    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

/// Checks `input` against the declared JSON schema: the input must be an
/// object, every `required` property must be present, and declared property
/// types must match. Deliberately shallow; tools deserialize into typed args
/// structs for the rest.
pub fn validate_input(schema: &Value, input: &Value) -> Result<(), String> {
    let Some(input_map) = input.as_object() else {
        return Err("tool input must be a JSON object".to_string());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !input_map.contains_key(name) {
                return Err(format!("missing required property '{name}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, value) in input_map {
            let Some(expected) = properties
                .get(name)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };

            let matches = match expected {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "object" => value.is_object(),
                "array" => value.is_array(),
                _ => true,
            };
            if !matches && !value.is_null() {
                return Err(format!("property '{name}' must be of type {expected}"));
            }
        }
    }

    Ok(())
}
