//! The orchestrator facade.
//!
//! One [`Agent`] owns one chat (all conversation versions) and runs at most
//! one turn at a time. A new `send_message` while a turn is in flight
//! cancels and replaces it; two turns never race. Rendering code observes
//! the agent through `ui_history()` snapshots, the loading watch, and the
//! event broadcast; it never mutates state.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use dash_core::{
    AgentEvent, Chat, ModelMessage, Sender, Settings, ToolRegistry, UiMessage, Verbosity,
};
use dash_llm::{generate_title, ChatClient};
use dash_storage::RecordStore;

use crate::config::AgentConfig;

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub(crate) struct AgentInner {
    pub(crate) llm: Arc<dyn ChatClient>,
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) records: Arc<RecordStore>,
    pub(crate) config: AgentConfig,
    pub(crate) chat: Mutex<Chat>,
    pub(crate) settings: Mutex<Settings>,
    pub(crate) events: broadcast::Sender<AgentEvent>,
    pub(crate) loading: watch::Sender<bool>,
    /// Latest unsaved snapshots, drained by the writer tasks. A `watch`
    /// slot keeps saves in request order: an older snapshot can never land
    /// on disk after a newer one.
    chat_writes: watch::Sender<Option<Chat>>,
    settings_writes: watch::Sender<Option<Settings>>,
    /// Token of the in-flight turn, if any.
    current_turn: Mutex<Option<CancellationToken>>,
    /// Serializes turns: a replacement waits here until the cancelled turn
    /// has finished unwinding.
    turn_gate: Mutex<()>,
}

impl AgentInner {
    pub(crate) fn emit(&self, event: AgentEvent) {
        // No receivers is fine; events are advisory.
        let _ = self.events.send(event);
    }

    /// Fire-and-forget persistence of the chat record. The snapshot lands
    /// in the writer slot and the writer task saves it; errors are logged,
    /// never surfaced, and never block the loop.
    pub(crate) async fn persist_chat(&self) {
        let snapshot = self.chat.lock().await.clone();
        let _ = self.chat_writes.send(Some(snapshot));
    }

    async fn persist_settings(&self) {
        let snapshot = self.settings.lock().await.clone();
        let _ = self.settings_writes.send(Some(snapshot));
    }

    /// Cancels any in-flight turn, registers this turn's token, and waits
    /// for the previous turn to unwind. Returns the gate guard so the
    /// caller holds the turn for its whole extent.
    async fn acquire_turn(&self) -> (CancellationToken, MutexGuard<'_, ()>) {
        let token = CancellationToken::new();
        {
            let mut current = self.current_turn.lock().await;
            if let Some(previous) = current.take() {
                log::debug!("interrupting in-flight turn");
                previous.cancel();
            }
            *current = Some(token.clone());
        }
        let gate = self.turn_gate.lock().await;
        (token, gate)
    }

    async fn finish_turn(&self, token: &CancellationToken) {
        let _ = self.loading.send(false);
        if !token.is_cancelled() {
            // Not replaced: the slot still holds our token.
            self.current_turn.lock().await.take();
        }
    }
}

#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn ChatClient>,
        registry: Arc<ToolRegistry>,
        records: Arc<RecordStore>,
        config: AgentConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (loading, _) = watch::channel(false);
        let (chat_writes, mut chat_rx) = watch::channel::<Option<Chat>>(None);
        let (settings_writes, mut settings_rx) = watch::channel::<Option<Settings>>(None);

        // One writer per record. Each loop always saves the latest snapshot,
        // so writes never reorder; the tasks exit when the agent is dropped.
        {
            let records = Arc::clone(&records);
            tokio::spawn(async move {
                while chat_rx.changed().await.is_ok() {
                    let snapshot = chat_rx.borrow_and_update().clone();
                    if let Some(chat) = snapshot {
                        if let Err(error) = records.save_chat(&chat).await {
                            log::warn!("failed to persist chat: {error}");
                        }
                    }
                }
            });
        }
        {
            let records = Arc::clone(&records);
            tokio::spawn(async move {
                while settings_rx.changed().await.is_ok() {
                    let snapshot = settings_rx.borrow_and_update().clone();
                    if let Some(settings) = snapshot {
                        if let Err(error) = records.save_settings(&settings).await {
                            log::warn!("failed to persist settings: {error}");
                        }
                    }
                }
            });
        }

        Self {
            inner: Arc::new(AgentInner {
                llm,
                registry,
                records,
                config,
                chat: Mutex::new(Chat::default()),
                settings: Mutex::new(Settings::default()),
                events,
                loading,
                chat_writes,
                settings_writes,
                current_turn: Mutex::new(None),
                turn_gate: Mutex::new(()),
            }),
        }
    }

    /// Like [`Agent::new`], but hydrated from the persisted chat and
    /// settings records. Missing or corrupt records fall back to defaults.
    pub async fn load(
        llm: Arc<dyn ChatClient>,
        registry: Arc<ToolRegistry>,
        records: Arc<RecordStore>,
        config: AgentConfig,
    ) -> Self {
        let agent = Self::new(llm, registry, records, config);
        let chat = agent.inner.records.load_chat().await;
        let settings = agent.inner.records.load_settings().await;
        *agent.inner.chat.lock().await = chat;
        *agent.inner.settings.lock().await = settings;
        agent
    }

    /// Sends one user message and drives the turn to completion. Empty or
    /// whitespace-only input is a silent no-op. Model and tool failures are
    /// converted into history entries; this never returns an error to the
    /// caller.
    pub async fn send_message(&self, text: &str) {
        let text = text.trim().to_string();
        if text.is_empty() {
            log::debug!("ignoring empty user message");
            return;
        }

        let (token, _gate) = self.inner.acquire_turn().await;
        if token.is_cancelled() {
            return;
        }

        let _ = self.inner.loading.send(true);
        self.inner.emit(AgentEvent::TurnStarted);

        let verbosity = self.inner.settings.lock().await.verbosity;
        let first_message = {
            let mut chat = self.inner.chat.lock().await;
            let conversation = chat.current_mut();
            if conversation.model_history().is_empty() {
                conversation.add_model_message(ModelMessage::system(format!(
                    "{}\n\n{}",
                    self.inner.config.system_prompt,
                    verbosity.instruction()
                )));
            }
            let first = !conversation.has_user_messages();
            conversation.add_user_message(&text);
            first
        };
        self.inner.persist_chat().await;

        if first_message {
            self.spawn_title_task(text);
        }

        self.inner.run_rounds(&token).await;
        self.inner.finish_turn(&token).await;
    }

    /// Edits an earlier user turn: forks the conversation at that entry,
    /// makes the fork the active version, and runs the edited text through
    /// a normal turn. Prior versions stay browsable.
    pub async fn edit_message(&self, ui_id: &str, new_text: &str) {
        let text = new_text.trim().to_string();
        if text.is_empty() {
            return;
        }

        let (token, _gate) = self.inner.acquire_turn().await;
        if token.is_cancelled() {
            return;
        }

        let forked = {
            let mut chat = self.inner.chat.lock().await;
            match chat.current().fork_at(ui_id, &text) {
                Some(fork) => {
                    chat.push_version(fork);
                    true
                }
                None => false,
            }
        };
        if !forked {
            log::warn!("edit requested for unknown message id {ui_id}");
            self.inner.finish_turn(&token).await;
            return;
        }

        let _ = self.inner.loading.send(true);
        self.inner.emit(AgentEvent::TurnStarted);
        self.inner.persist_chat().await;

        self.inner.run_rounds(&token).await;
        self.inner.finish_turn(&token).await;
    }

    /// Cooperatively cancels the in-flight turn, if any. Once this returns,
    /// the cancelled turn has finished unwinding (rollback included) and
    /// can no longer mutate state. Safe to call when idle.
    pub async fn cancel(&self) {
        let token = self.inner.current_turn.lock().await.take();
        let Some(token) = token else {
            return;
        };
        token.cancel();
        // Wait for the turn to release the gate after its rollback.
        let _gate = self.inner.turn_gate.lock().await;
    }

    /// Changes verbosity and re-injects the matching system instruction
    /// into both histories without disturbing the loop.
    pub async fn set_verbosity(&self, verbosity: Verbosity) {
        self.inner.settings.lock().await.verbosity = verbosity;
        {
            let mut chat = self.inner.chat.lock().await;
            let conversation = chat.current_mut();
            conversation.add_model_message(ModelMessage::system(verbosity.instruction()));
            conversation.add_ui_notification(
                Sender::System,
                match verbosity {
                    Verbosity::Concise => "Answers will be concise.",
                    Verbosity::Educational => "Answers will explain the queries they use.",
                },
            );
        }
        self.inner.persist_settings().await;
        self.inner.persist_chat().await;
    }

    pub async fn set_show_tool_calls(&self, show: bool) {
        self.inner.settings.lock().await.show_tool_calls = show;
        self.inner.persist_settings().await;
    }

    pub async fn set_display_mode(&self, mode: dash_core::DisplayMode) {
        self.inner.settings.lock().await.display_mode = mode;
        self.inner.persist_settings().await;
    }

    /// Cancels any in-flight turn and resets to a single empty conversation.
    pub async fn clear_history(&self) {
        self.cancel().await;
        *self.inner.chat.lock().await = Chat::default();
        self.inner.persist_chat().await;
    }

    pub async fn ui_history(&self) -> Vec<UiMessage> {
        self.inner.chat.lock().await.current().ui_history().to_vec()
    }

    pub async fn conversation_name(&self) -> String {
        self.inner.chat.lock().await.current().name.clone()
    }

    pub async fn settings(&self) -> Settings {
        self.inner.settings.lock().await.clone()
    }

    pub fn loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.inner.events.subscribe()
    }

    /// On the first user message of a fresh conversation, derive a short
    /// title concurrently with the main turn. Best-effort: failure falls
    /// back to a placeholder inside `generate_title` and never touches the
    /// turn itself.
    fn spawn_title_task(&self, first_text: String) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let title = generate_title(inner.llm.as_ref(), &first_text).await;
            inner.chat.lock().await.current_mut().name = title.clone();
            inner.persist_chat().await;
            inner.emit(AgentEvent::TitleReady { title });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use dash_core::{history_is_consistent, Tool, ToolCall, ToolError, ToolOutput, ToolSchema};
    use dash_llm::{AiResponse, LlmError};
    use dash_storage::FileStore;

    /// Replays a scripted sequence of model responses. Title calls are
    /// answered separately and do not consume the script.
    struct ScriptedClient {
        responses: StdMutex<VecDeque<AiResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(responses: Vec<AiResponse>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn invoke(
            &self,
            messages: &[ModelMessage],
            _tools: &[ToolSchema],
            _cancel: &CancellationToken,
        ) -> dash_llm::client::Result<AiResponse> {
            if let Some(ModelMessage::System { text }) = messages.first() {
                if text.starts_with("Produce a title") {
                    return Ok(AiResponse {
                        text: "Datasource check".to_string(),
                        tool_calls: Vec::new(),
                    });
                }
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.lock().unwrap().pop_front() {
                Some(response) => Ok(response),
                None => Err(LlmError::Api("script exhausted".to_string())),
            }
        }
    }

    fn answer(text: &str) -> AiResponse {
        AiResponse {
            text: text.to_string(),
            tool_calls: Vec::new(),
        }
    }

    fn tool_round(text: &str, tool: &str) -> AiResponse {
        AiResponse {
            text: text.to_string(),
            tool_calls: vec![ToolCall::new(tool, json!({}))],
        }
    }

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Returns a fixed datasource list"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text(r#"[{"uid":"prom","name":"Prometheus"}]"#))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            Err(ToolError::Execution("timeout".to_string()))
        }
    }

    struct HangingTool;

    #[async_trait]
    impl Tool for HangingTool {
        fn name(&self) -> &str {
            "hang"
        }

        fn description(&self) -> &str {
            "Never finishes on its own"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ToolOutput::text("too late"))
        }
    }

    fn test_agent(client: Arc<ScriptedClient>) -> (Agent, TempDir) {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(RecordStore::new(Arc::new(FileStore::new(dir.path()))));
        let registry = Arc::new(ToolRegistry::new());
        registry.register(LookupTool).unwrap();
        registry.register(FailingTool).unwrap();
        registry.register(HangingTool).unwrap();
        let config = AgentConfig {
            max_rounds: 3,
            system_prompt: "You are a test assistant.".to_string(),
            model_name: None,
        };
        (Agent::new(client, registry, records, config), dir)
    }

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    async fn wait_for_working_tool(agent: &Agent) {
        for _ in 0..500 {
            let working = agent
                .ui_history()
                .await
                .iter()
                .any(|m| m.tool_children.iter().any(|c| c.working));
            if working {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no tool entered the working state in time");
    }

    #[tokio::test]
    async fn empty_message_is_a_no_op() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        agent.send_message("   ").await;
        agent.send_message("").await;

        assert_eq!(client.call_count(), 0);
        assert!(agent.ui_history().await.is_empty());
        assert!(!agent.loading());
    }

    #[tokio::test]
    async fn single_tool_round_nests_the_call_under_one_assistant_entry() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_round("Let me check.", "lookup"),
            answer("You have one datasource."),
        ]));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        agent.send_message("what datasources do I have?").await;

        let ui = agent.ui_history().await;
        assert_eq!(ui.len(), 2);
        assert_eq!(ui[0].sender, Sender::User);
        assert_eq!(ui[1].sender, Sender::Ai);
        assert_eq!(ui[1].content, "You have one datasource.");
        assert_eq!(ui[1].tool_children.len(), 1);

        let child = &ui[1].tool_children[0];
        assert_eq!(child.name, "lookup");
        assert!(!child.working);
        assert!(child.error.is_none());
        assert!(child.output.is_some());

        let history = {
            let chat = agent.inner.chat.lock().await;
            chat.current().model_history().to_vec()
        };
        assert!(history_is_consistent(&history));
        assert!(matches!(history.first(), Some(ModelMessage::System { .. })));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn tool_failure_feeds_the_model_and_the_loop_recovers() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_round("Trying a query.", "failing"),
            answer("That query did not work, try a shorter range."),
        ]));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        agent.send_message("query something").await;

        // The failure reached the model as a result and a second round ran.
        assert_eq!(client.call_count(), 2);

        let ui = agent.ui_history().await;
        let child = &ui[1].tool_children[0];
        assert_eq!(child.error.as_deref(), Some("timeout"));
        assert!(!child.working);

        let history = {
            let chat = agent.inner.chat.lock().await;
            chat.current().model_history().to_vec()
        };
        assert!(history_is_consistent(&history));
        assert!(history.iter().any(|m| matches!(
            m,
            ModelMessage::ToolResult { content, .. } if content.contains("timeout")
        )));
    }

    #[tokio::test]
    async fn round_ceiling_stops_the_loop() {
        let client = Arc::new(ScriptedClient::new(vec![
            tool_round("Round one.", "lookup"),
            tool_round("Round two.", "lookup"),
            tool_round("Round three.", "lookup"),
            tool_round("Round four.", "lookup"),
            tool_round("Round five.", "lookup"),
        ]));
        let (agent, _dir) = test_agent(Arc::clone(&client));
        let mut events = agent.subscribe();

        agent.send_message("keep going").await;

        // max_rounds is 3: exactly three model calls, then a forced stop.
        assert_eq!(client.call_count(), 3);
        assert!(!agent.loading());

        let mut completed = None;
        while let Ok(event) = events.try_recv() {
            if let AgentEvent::Complete { text } = event {
                completed = Some(text);
            }
        }
        assert_eq!(completed.as_deref(), Some("Round three."));

        let history = {
            let chat = agent.inner.chat.lock().await;
            chat.current().model_history().to_vec()
        };
        assert!(history_is_consistent(&history));
    }

    #[tokio::test]
    async fn model_error_becomes_a_visible_notice() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        agent.send_message("hello").await;

        let ui = agent.ui_history().await;
        assert_eq!(ui.len(), 2);
        assert_eq!(ui[1].sender, Sender::System);
        assert!(ui[1].content.contains("The model call failed"));
        assert!(!agent.loading());
    }

    #[tokio::test]
    async fn cancel_when_idle_does_nothing() {
        let client = Arc::new(ScriptedClient::new(vec![answer("hi")]));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        agent.cancel().await;

        agent.send_message("hello").await;
        assert_eq!(agent.ui_history().await.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_rolls_back_the_interrupted_round() {
        init_logging();
        let client = Arc::new(ScriptedClient::new(vec![
            tool_round("Checking.", "hang"),
            answer("Second answer."),
        ]));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        let runner = agent.clone();
        let turn = tokio::spawn(async move {
            runner.send_message("first question").await;
        });

        wait_for_working_tool(&agent).await;

        agent.cancel().await;
        turn.await.unwrap();

        // The whole interrupted round is gone; only the user entry remains.
        let ui = agent.ui_history().await;
        assert_eq!(ui.len(), 1);
        assert_eq!(ui[0].sender, Sender::User);
        assert!(!agent.loading());

        let history = {
            let chat = agent.inner.chat.lock().await;
            chat.current().model_history().to_vec()
        };
        assert!(history_is_consistent(&history));
        assert!(!history
            .iter()
            .any(|m| matches!(m, ModelMessage::AiToolRequest { .. })));

        // The conversation is still usable afterwards.
        agent.send_message("second question").await;
        let ui = agent.ui_history().await;
        assert_eq!(ui.last().unwrap().content, "Second answer.");
    }

    #[tokio::test]
    async fn new_message_interrupts_the_inflight_turn() {
        init_logging();
        let client = Arc::new(ScriptedClient::new(vec![
            tool_round("Checking.", "hang"),
            answer("Answer to the second question."),
        ]));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        let runner = agent.clone();
        let first = tokio::spawn(async move {
            runner.send_message("first question").await;
        });

        wait_for_working_tool(&agent).await;

        agent.send_message("second question").await;
        first.await.unwrap();

        let ui = agent.ui_history().await;
        let contents: Vec<&str> = ui.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "first question",
                "second question",
                "Answer to the second question."
            ]
        );
        assert!(!agent.loading());
    }

    #[tokio::test]
    async fn verbosity_change_is_announced_in_the_transcript() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let (agent, _dir) = test_agent(client);

        agent.set_verbosity(Verbosity::Educational).await;

        let ui = agent.ui_history().await;
        assert_eq!(ui.len(), 1);
        assert_eq!(ui[0].sender, Sender::System);
        assert!(ui[0].content.contains("explain"));
        assert_eq!(agent.settings().await.verbosity, Verbosity::Educational);
    }

    #[tokio::test]
    async fn first_message_titles_the_conversation() {
        let client = Arc::new(ScriptedClient::new(vec![answer("hi")]));
        let (agent, _dir) = test_agent(client);

        assert_eq!(agent.conversation_name().await, "New conversation");
        agent.send_message("what datasources do I have?").await;

        for _ in 0..500 {
            if agent.conversation_name().await == "Datasource check" {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("title task never renamed the conversation");
    }

    #[tokio::test]
    async fn chat_survives_a_reload() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(RecordStore::new(Arc::new(FileStore::new(dir.path()))));
        let registry = Arc::new(ToolRegistry::new());
        registry.register(LookupTool).unwrap();
        let config = AgentConfig {
            max_rounds: 3,
            system_prompt: "You are a test assistant.".to_string(),
            model_name: None,
        };

        let client = Arc::new(ScriptedClient::new(vec![answer("The answer.")]));
        let agent = Agent::new(
            client,
            Arc::clone(&registry),
            Arc::clone(&records),
            config.clone(),
        );
        agent.send_message("a question").await;

        // Saves are fire-and-forget; wait for the record to land.
        let reload_client = Arc::new(ScriptedClient::new(Vec::new()));
        for _ in 0..500 {
            let reloaded = Agent::load(
                Arc::clone(&reload_client) as Arc<dyn ChatClient>,
                Arc::clone(&registry),
                Arc::clone(&records),
                config.clone(),
            )
            .await;
            let ui = reloaded.ui_history().await;
            if ui.len() == 2 {
                assert_eq!(ui[0].content, "a question");
                assert_eq!(ui[1].content, "The answer.");
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("persisted chat never became loadable");
    }

    #[tokio::test]
    async fn rapid_saves_converge_on_the_latest_snapshot() {
        let dir = TempDir::new().unwrap();
        let records = Arc::new(RecordStore::new(Arc::new(FileStore::new(dir.path()))));
        let registry = Arc::new(ToolRegistry::new());
        let config = AgentConfig {
            max_rounds: 3,
            system_prompt: "You are a test assistant.".to_string(),
            model_name: None,
        };
        let client = Arc::new(ScriptedClient::new(vec![
            answer("one"),
            answer("two"),
            answer("three"),
        ]));
        let agent = Agent::new(client, registry, Arc::clone(&records), config);

        // Each send persists several times in quick succession; the record
        // on disk must end up at the newest state, never an older one.
        agent.send_message("first").await;
        agent.send_message("second").await;
        agent.send_message("third").await;
        let live = agent.ui_history().await;

        for _ in 0..500 {
            let stored = records.load_chat().await;
            if stored.current().ui_history() == live.as_slice() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("stored record never caught up with the live history");
    }

    #[tokio::test]
    async fn edit_forks_the_conversation() {
        let client = Arc::new(ScriptedClient::new(vec![
            answer("First answer."),
            answer("Edited answer."),
        ]));
        let (agent, _dir) = test_agent(Arc::clone(&client));

        agent.send_message("original question").await;
        let original_ui = agent.ui_history().await;
        let user_id = original_ui[0].id.clone();

        agent.edit_message(&user_id, "edited question").await;

        let ui = agent.ui_history().await;
        assert_eq!(ui.len(), 2);
        assert_eq!(ui[0].content, "edited question");
        assert_eq!(ui[1].content, "Edited answer.");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn clear_history_resets_to_an_empty_conversation() {
        let client = Arc::new(ScriptedClient::new(vec![answer("hi")]));
        let (agent, _dir) = test_agent(client);

        agent.send_message("hello").await;
        assert!(!agent.ui_history().await.is_empty());

        agent.clear_history().await;
        assert!(agent.ui_history().await.is_empty());
        assert_eq!(agent.conversation_name().await, "New conversation");
    }
}
