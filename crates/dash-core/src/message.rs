use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, input: Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4()),
            name: name.into(),
            input,
        }
    }
}

/// One turn of the model-facing history. This is the exact shape sent to the
/// LLM on every round; it never carries UI-only bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelMessage {
    System {
        text: String,
    },
    /// `correlation_id` is the id of the paired UI entry, used to truncate
    /// both histories at the same point when a turn is edited.
    Human {
        text: String,
        correlation_id: String,
    },
    AiText {
        text: String,
    },
    AiToolRequest {
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact: Option<Value>,
    },
}

impl ModelMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self::System { text: text.into() }
    }

    pub fn human(text: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::Human {
            text: text.into(),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn ai_text(text: impl Into<String>) -> Self {
        Self::AiText { text: text.into() }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            artifact: None,
        }
    }

    pub fn tool_result_with_artifact(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        artifact: Value,
    ) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            artifact: Some(artifact),
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human { .. })
    }
}

/// Checks the structural invariant the LLM API enforces: every tool call id
/// of an `AiToolRequest` is answered by exactly one `ToolResult` before the
/// next `Human` message.
pub fn history_is_consistent(history: &[ModelMessage]) -> bool {
    let mut open: Vec<String> = Vec::new();

    for message in history {
        match message {
            ModelMessage::Human { .. } => {
                if !open.is_empty() {
                    return false;
                }
            }
            ModelMessage::AiToolRequest { tool_calls } => {
                if !open.is_empty() {
                    return false;
                }
                open.extend(tool_calls.iter().map(|call| call.id.clone()));
            }
            ModelMessage::ToolResult { tool_call_id, .. } => {
                let Some(index) = open.iter().position(|id| id == tool_call_id) else {
                    return false;
                };
                open.remove(index);
            }
            _ => {}
        }
    }

    open.is_empty()
}
