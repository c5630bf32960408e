//! Display-oriented projection of a conversation.
//!
//! UI entries are what rendering code subscribes to; they carry tool
//! execution state nested under the assistant entry that requested it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    System,
}

/// Lifecycle of one tool call as the user sees it:
/// pending -> working -> success | error. A cancelled call is removed from
/// its parent entry instead of being left dangling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUiState {
    pub call_id: String,
    pub name: String,
    pub input: Value,
    pub working: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl ToolUiState {
    pub fn pending(call_id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            input,
            working: false,
            error: None,
            output: None,
        }
    }

    pub fn mark_working(&mut self) {
        self.working = true;
        self.error = None;
    }

    pub fn mark_success(&mut self, output: Value) {
        self.working = false;
        self.output = Some(output);
        self.error = None;
    }

    pub fn mark_error(&mut self, error: impl Into<String>) {
        self.working = false;
        self.error = Some(error.into());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_children: Vec<ToolUiState>,
}

impl UiMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            tool_children: Vec::new(),
        }
    }

    pub fn tool_child(&self, call_id: &str) -> Option<&ToolUiState> {
        self.tool_children.iter().find(|t| t.call_id == call_id)
    }

    pub fn tool_child_mut(&mut self, call_id: &str) -> Option<&mut ToolUiState> {
        self.tool_children.iter_mut().find(|t| t.call_id == call_id)
    }
}
