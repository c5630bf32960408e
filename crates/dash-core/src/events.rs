use serde::{Deserialize, Serialize};

/// Events broadcast by the orchestrator. Rendering code subscribes to these
/// and reads the UI history snapshot; it never mutates conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    TurnStarted,

    ToolStart {
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    ToolComplete {
        tool_call_id: String,
        content: String,
    },

    ToolError {
        tool_call_id: String,
        error: String,
    },

    /// Best-effort title generation finished (or fell back to a placeholder).
    TitleReady {
        title: String,
    },

    Complete {
        text: String,
    },

    Cancelled,

    Error {
        message: String,
    },
}
