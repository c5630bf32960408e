//! The agent round loop: LLM invocation, sequential tool dispatch, result
//! appends, and re-invocation until a final answer, the ceiling, an error,
//! or a cancellation.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use dash_core::{AgentEvent, ModelMessage, Sender};
use dash_llm::LlmError;

use crate::agent::AgentInner;

impl AgentInner {
    pub(crate) async fn run_rounds(&self, cancel: &CancellationToken) {
        for round in 0..self.config.max_rounds {
            if cancel.is_cancelled() {
                self.rollback().await;
                return;
            }

            // Fresh snapshot every round: tools may be registered or
            // deregistered while the loop runs.
            let schemas = self.registry.schemas();
            let history = self.chat.lock().await.current().model_history().to_vec();

            log::debug!(
                "round {}/{}: invoking model with {} messages, {} tools",
                round + 1,
                self.config.max_rounds,
                history.len(),
                schemas.len()
            );

            let response = match self.llm.invoke(&history, &schemas, cancel).await {
                Ok(response) => response,
                Err(LlmError::Cancelled) => {
                    self.rollback().await;
                    return;
                }
                Err(error) => {
                    log::warn!("model call failed: {error}");
                    {
                        let mut chat = self.chat.lock().await;
                        let conversation = chat.current_mut();
                        conversation.add_ui_notification(
                            Sender::System,
                            format!("The model call failed: {error}"),
                        );
                        conversation.close_turn();
                    }
                    self.persist_chat().await;
                    self.emit(AgentEvent::Error {
                        message: error.to_string(),
                    });
                    return;
                }
            };

            if !response.has_tool_calls() {
                {
                    let mut chat = self.chat.lock().await;
                    let conversation = chat.current_mut();
                    conversation.add_ai_text(response.text.clone());
                    conversation.close_turn();
                }
                self.persist_chat().await;
                self.emit(AgentEvent::Complete {
                    text: response.text,
                });
                return;
            }

            {
                let mut chat = self.chat.lock().await;
                chat.current_mut()
                    .begin_tool_round(Some(response.text.as_str()), response.tool_calls.clone());
            }
            self.persist_chat().await;

            // Strictly sequential: rollback assumes at most one tool is ever
            // working when a cancellation lands.
            for call in &response.tool_calls {
                if cancel.is_cancelled() {
                    self.rollback().await;
                    return;
                }

                self.chat.lock().await.current_mut().set_tool_working(&call.id);
                self.emit(AgentEvent::ToolStart {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    arguments: call.input.clone(),
                });

                let invocation = match self.registry.invoke(call, cancel).await {
                    Ok(invocation) => invocation,
                    Err(_) => {
                        // Only cancellation propagates out of invoke.
                        self.rollback().await;
                        return;
                    }
                };

                match &invocation.error {
                    Some(error) => {
                        log::debug!("tool '{}' failed: {error}", call.name);
                        self.chat.lock().await.current_mut().record_tool_failure(
                            &call.id,
                            invocation.content.as_str(),
                            error.as_str(),
                        );
                        self.emit(AgentEvent::ToolError {
                            tool_call_id: call.id.clone(),
                            error: error.clone(),
                        });
                    }
                    None => {
                        let output = serde_json::from_str(&invocation.content)
                            .unwrap_or_else(|_| Value::String(invocation.content.clone()));
                        self.chat.lock().await.current_mut().record_tool_success(
                            &call.id,
                            invocation.content.as_str(),
                            invocation.artifact.clone(),
                            output,
                        );
                        self.emit(AgentEvent::ToolComplete {
                            tool_call_id: call.id.clone(),
                            content: invocation.content,
                        });
                    }
                }
                self.persist_chat().await;
            }
        }

        log::warn!(
            "tool-call ceiling of {} rounds reached; stopping without a final answer",
            self.config.max_rounds
        );
        let last_text = {
            let mut chat = self.chat.lock().await;
            let conversation = chat.current_mut();
            let text = conversation
                .model_history()
                .iter()
                .rev()
                .find_map(|message| match message {
                    ModelMessage::AiText { text } => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            conversation.close_turn();
            text
        };
        self.persist_chat().await;
        self.emit(AgentEvent::Complete { text: last_text });
    }

    /// Unwinds a cancelled turn: the conversation drops or closes out the
    /// interrupted tool round so no dangling tool call survives, then the
    /// cancellation is announced.
    async fn rollback(&self) {
        self.chat.lock().await.current_mut().rollback_cancelled_turn();
        self.persist_chat().await;
        self.emit(AgentEvent::Cancelled);
        log::debug!("turn cancelled and rolled back");
    }
}
