//! The dual-history conversation.
//!
//! A conversation owns two parallel sequences: the model-facing history sent
//! to the LLM on every round, and the UI-facing transcript shown to the user.
//! Every mutation goes through the methods here so the two histories cannot
//! drift; independent call sites never touch either vector directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{ModelMessage, ToolCall};
use crate::ui::{Sender, ToolUiState, UiMessage};

pub const CANCELLED_BY_USER: &str = "cancelled by user";

/// Transient bookkeeping for the turn currently in flight. Never persisted;
/// a freshly loaded conversation is always between turns.
#[derive(Debug, Clone, Default)]
struct TurnScratch {
    /// UI id of the assistant entry opened for tool display this turn.
    assistant_ui_id: Option<String>,
    /// Whether the active tool round appended an `AiText` before its request.
    round_has_text: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub name: String,
    pub created_at: DateTime<Utc>,
    model_history: Vec<ModelMessage>,
    ui_history: Vec<UiMessage>,
    #[serde(skip)]
    turn: TurnScratch,
}

impl Conversation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            model_history: Vec::new(),
            ui_history: Vec::new(),
            turn: TurnScratch::default(),
        }
    }

    pub fn model_history(&self) -> &[ModelMessage] {
        &self.model_history
    }

    pub fn ui_history(&self) -> &[UiMessage] {
        &self.ui_history
    }

    pub fn has_user_messages(&self) -> bool {
        self.ui_history.iter().any(|m| m.sender == Sender::User)
    }

    /// First user turn, used for title generation.
    pub fn first_user_text(&self) -> Option<&str> {
        self.ui_history
            .iter()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.content.as_str())
    }

    /// Appends a user message to both histories atomically. The returned id
    /// is shared between the UI entry and the `Human` correlation id.
    pub fn add_user_message(&mut self, text: impl Into<String>) -> String {
        let entry = UiMessage::new(Sender::User, text.into());
        let id = entry.id.clone();
        self.model_history
            .push(ModelMessage::human(entry.content.clone(), id.clone()));
        self.ui_history.push(entry);
        id
    }

    /// Appends the final assistant answer. If the current turn already opened
    /// an assistant entry for tool display, the text lands there instead of
    /// creating a second transcript entry.
    pub fn add_ai_text(&mut self, text: impl Into<String>) -> String {
        let text = text.into();
        self.model_history.push(ModelMessage::ai_text(text.clone()));

        if let Some(id) = self.turn.assistant_ui_id.take() {
            if let Some(entry) = self.ui_history.iter_mut().find(|m| m.id == id) {
                entry.content = text;
                return id;
            }
        }

        let entry = UiMessage::new(Sender::Ai, text);
        let id = entry.id.clone();
        self.ui_history.push(entry);
        id
    }

    /// UI-only entry with no model-history counterpart (system notices,
    /// tool notifications).
    pub fn add_ui_notification(&mut self, sender: Sender, text: impl Into<String>) -> String {
        let entry = UiMessage::new(sender, text.into());
        let id = entry.id.clone();
        self.ui_history.push(entry);
        id
    }

    /// Model-history-only append, e.g. a re-injected verbosity instruction.
    pub fn add_model_message(&mut self, message: ModelMessage) {
        self.model_history.push(message);
    }

    /// Opens a tool round: appends the assistant text (if any) and the
    /// `AiToolRequest` to the model history, and seeds pending tool states
    /// under a single assistant UI entry reused across rounds of the turn.
    pub fn begin_tool_round(&mut self, text: Option<&str>, tool_calls: Vec<ToolCall>) {
        self.turn.round_has_text = false;
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            self.model_history.push(ModelMessage::ai_text(text));
            self.turn.round_has_text = true;
        }

        let assistant_id = match self.turn.assistant_ui_id.clone() {
            Some(id) => id,
            None => {
                let entry = UiMessage::new(Sender::Ai, "");
                let id = entry.id.clone();
                self.ui_history.push(entry);
                self.turn.assistant_ui_id = Some(id.clone());
                id
            }
        };

        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            if let Some(entry) = self.ui_history.iter_mut().find(|m| m.id == assistant_id) {
                entry.content = text.to_string();
            }
        }

        if let Some(entry) = self.ui_history.iter_mut().find(|m| m.id == assistant_id) {
            for call in &tool_calls {
                entry.tool_children.push(ToolUiState::pending(
                    call.id.clone(),
                    call.name.clone(),
                    call.input.clone(),
                ));
            }
        }

        self.model_history
            .push(ModelMessage::AiToolRequest { tool_calls });
    }

    pub fn set_tool_working(&mut self, call_id: &str) {
        if let Some(state) = self.tool_state_mut(call_id) {
            state.mark_working();
        }
    }

    /// Records a successful tool call in both histories.
    pub fn record_tool_success(
        &mut self,
        call_id: &str,
        content: impl Into<String>,
        artifact: Option<Value>,
        output: Value,
    ) {
        let content = content.into();
        let message = match artifact {
            Some(artifact) => {
                ModelMessage::tool_result_with_artifact(call_id, content, artifact)
            }
            None => ModelMessage::tool_result(call_id, content),
        };
        self.model_history.push(message);

        if let Some(state) = self.tool_state_mut(call_id) {
            state.mark_success(output);
        }
    }

    /// Records a failed tool call: the model sees the failure as result
    /// content and may retry with different arguments, while the UI entry
    /// carries the bare error string.
    pub fn record_tool_failure(
        &mut self,
        call_id: &str,
        content: impl Into<String>,
        error: impl Into<String>,
    ) {
        self.model_history
            .push(ModelMessage::tool_result(call_id, content));
        if let Some(state) = self.tool_state_mut(call_id) {
            state.mark_error(error);
        }
    }

    /// Unwinds the active turn after a cancellation.
    ///
    /// If no call of the interrupted round completed, the whole round (its
    /// `AiToolRequest` and any assistant text appended with it) is removed,
    /// along with the empty assistant UI shell. If some calls already
    /// completed their results are kept and every unanswered call gets a
    /// synthetic cancellation result, so the model history never carries a
    /// dangling tool call either way.
    pub fn rollback_cancelled_turn(&mut self) {
        let Some(request_index) = self
            .model_history
            .iter()
            .rposition(|m| matches!(m, ModelMessage::AiToolRequest { .. }))
        else {
            self.close_turn();
            return;
        };

        let ModelMessage::AiToolRequest { tool_calls } = &self.model_history[request_index] else {
            unreachable!("rposition matched AiToolRequest");
        };
        let call_ids: Vec<String> = tool_calls.iter().map(|c| c.id.clone()).collect();

        let answered: Vec<String> = self.model_history[request_index + 1..]
            .iter()
            .filter_map(|m| match m {
                ModelMessage::ToolResult { tool_call_id, .. } => Some(tool_call_id.clone()),
                _ => None,
            })
            .collect();
        let unanswered: Vec<String> = call_ids
            .iter()
            .filter(|id| !answered.contains(id))
            .cloned()
            .collect();

        if unanswered.is_empty() {
            // The interrupted round already completed; nothing dangles.
            self.close_turn();
            return;
        }

        if answered.is_empty() {
            self.model_history.remove(request_index);
            if self.turn.round_has_text && request_index > 0 {
                if matches!(
                    self.model_history.get(request_index - 1),
                    Some(ModelMessage::AiText { .. })
                ) {
                    self.model_history.remove(request_index - 1);
                }
            }
            self.remove_tool_children(&call_ids);
            if self.turn.round_has_text {
                // The shell text belongs to the removed round.
                if let Some(id) = self.turn.assistant_ui_id.clone() {
                    if let Some(entry) = self.ui_history.iter_mut().find(|m| m.id == id) {
                        entry.content.clear();
                    }
                }
            }
        } else {
            for id in &unanswered {
                self.model_history
                    .push(ModelMessage::tool_result(id, CANCELLED_BY_USER));
            }
            self.remove_tool_children(&unanswered);
        }

        self.prune_empty_assistant_shell();
        self.close_turn();
    }

    /// Marks the turn as finished without touching history. Called on the
    /// normal completion path so the next turn opens a fresh assistant entry.
    pub fn close_turn(&mut self) {
        self.turn = TurnScratch::default();
    }

    /// Forks this conversation at a user turn: both histories are truncated
    /// at the correlated index and re-seeded with the edited text. `self` is
    /// left untouched.
    pub fn fork_at(&self, ui_id: &str, new_text: impl Into<String>) -> Option<Conversation> {
        let ui_index = self
            .ui_history
            .iter()
            .position(|m| m.id == ui_id && m.sender == Sender::User)?;
        let model_index = self.model_history.iter().position(
            |m| matches!(m, ModelMessage::Human { correlation_id, .. } if correlation_id == ui_id),
        )?;

        let mut fork = Conversation {
            name: self.name.clone(),
            created_at: Utc::now(),
            model_history: self.model_history[..model_index].to_vec(),
            ui_history: self.ui_history[..ui_index].to_vec(),
            turn: TurnScratch::default(),
        };
        fork.add_user_message(new_text);
        Some(fork)
    }

    pub fn clear(&mut self) {
        self.model_history.clear();
        self.ui_history.clear();
        self.turn = TurnScratch::default();
    }

    fn tool_state_mut(&mut self, call_id: &str) -> Option<&mut ToolUiState> {
        let assistant_id = self.turn.assistant_ui_id.clone()?;
        self.ui_history
            .iter_mut()
            .find(|m| m.id == assistant_id)?
            .tool_child_mut(call_id)
    }

    fn remove_tool_children(&mut self, call_ids: &[String]) {
        if let Some(id) = self.turn.assistant_ui_id.clone() {
            if let Some(entry) = self.ui_history.iter_mut().find(|m| m.id == id) {
                entry
                    .tool_children
                    .retain(|t| !call_ids.contains(&t.call_id));
            }
        }
    }

    fn prune_empty_assistant_shell(&mut self) {
        if let Some(id) = self.turn.assistant_ui_id.clone() {
            if let Some(index) = self.ui_history.iter().position(|m| m.id == id) {
                let entry = &self.ui_history[index];
                if entry.content.trim().is_empty() && entry.tool_children.is_empty() {
                    self.ui_history.remove(index);
                }
            }
        }
    }
}

/// The persisted top-level record: every fork version plus the active one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub conversations: Vec<Conversation>,
    pub current: usize,
}

impl Default for Chat {
    fn default() -> Self {
        Self {
            conversations: vec![Conversation::new("New conversation")],
            current: 0,
        }
    }
}

impl Chat {
    /// A usable record has at least one conversation and `current` pointing
    /// inside it. A persisted record that fails this must not be installed;
    /// `current()` indexes unchecked.
    pub fn is_well_formed(&self) -> bool {
        self.current < self.conversations.len()
    }

    pub fn current(&self) -> &Conversation {
        &self.conversations[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Conversation {
        &mut self.conversations[self.current]
    }

    /// Adds a fork as the new active version; prior versions stay browsable.
    pub fn push_version(&mut self, conversation: Conversation) {
        self.conversations.push(conversation);
        self.current = self.conversations.len() - 1;
    }
}
