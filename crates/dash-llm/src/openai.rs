//! OpenAI-compatible chat-completions client (non-streaming).
//!
//! Builds a compat JSON body without leaking internal `ModelMessage` fields
//! (like correlation ids and artifacts) and parses the first choice back
//! into an [`AiResponse`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use dash_core::{ModelMessage, ToolCall, ToolSchema};

use crate::client::{AiResponse, ChatClient, LlmError, Result};

pub struct OpenAiCompatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn send(&self, body: Value) -> Result<AiResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {status}: {text}")));
        }

        let completion: ChatCompletion = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Api("response contained no choices".to_string()))?;

        Ok(AiResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    input: serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|_| json!({})),
                })
                .collect(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> Result<AiResponse> {
        let body = build_compat_body(&self.model, messages, tools);

        tokio::select! {
            _ = cancel.cancelled() => Err(LlmError::Cancelled),
            response = self.send(body) => response,
        }
    }
}

/// Convert the model-facing history to the chat-completions message array.
/// Correlation ids and artifacts are internal and intentionally omitted.
pub fn messages_to_compat_json(messages: &[ModelMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match message {
            ModelMessage::System { text } => json!({"role": "system", "content": text}),
            ModelMessage::Human { text, .. } => json!({"role": "user", "content": text}),
            ModelMessage::AiText { text } => json!({"role": "assistant", "content": text}),
            ModelMessage::AiToolRequest { tool_calls } => json!({
                "role": "assistant",
                "content": "",
                "tool_calls": tool_calls
                    .iter()
                    .map(|call| json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.input.to_string(),
                        },
                    }))
                    .collect::<Vec<_>>(),
            }),
            ModelMessage::ToolResult {
                tool_call_id,
                content,
                ..
            } => json!({
                "role": "tool",
                "tool_call_id": tool_call_id,
                "content": content,
            }),
        })
        .collect()
}

pub fn build_compat_body(model: &str, messages: &[ModelMessage], tools: &[ToolSchema]) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_compat_json(messages),
        "stream": false,
    });

    if !tools.is_empty() {
        body["tools"] = json!(tools);
    }

    body
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<CompatChoice>,
}

#[derive(Debug, Deserialize)]
struct CompatChoice {
    message: CompatMessage,
}

#[derive(Debug, Deserialize)]
struct CompatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<CompatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct CompatToolCall {
    id: String,
    function: CompatFunction,
}

#[derive(Debug, Deserialize)]
struct CompatFunction {
    name: String,
    arguments: String,
}
