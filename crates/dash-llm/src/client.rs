use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use dash_core::{ModelMessage, ToolCall, ToolSchema};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// One model response: assistant text, plus the tool calls it requested (if
/// any). What the orchestrator does with them is not this crate's concern.
#[derive(Debug, Clone, Default)]
pub struct AiResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AiResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// The LLM invocation boundary. The hosted chat-completion API behind it is
/// opaque beyond this contract; every call is abortable via the token.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> Result<AiResponse>;
}
