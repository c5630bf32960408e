//! The two durable records the assistant keeps: the chat transcript (all
//! conversation versions) and the per-profile settings.
//!
//! Writes are best-effort and serialized: at most one write is in flight at
//! a time, and a new write waits for the prior one before starting, so two
//! overlapping saves cannot interleave on the single durable record.

use std::sync::Arc;

use tokio::sync::Mutex;

use dash_core::{Chat, Settings};

use crate::store::{KvStore, Result};

pub const CHAT_KEY: &str = "chat";
pub const SETTINGS_KEY: &str = "settings";

pub struct RecordStore {
    store: Arc<dyn KvStore>,
    write_gate: Mutex<()>,
}

impl RecordStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_gate: Mutex::new(()),
        }
    }

    /// Loads the chat record, falling back to a single empty conversation on
    /// a missing or corrupt record. Corruption is logged, never surfaced.
    /// A record that deserializes but is structurally unusable (no
    /// conversations, or `current` out of range) counts as corrupt.
    pub async fn load_chat(&self) -> Chat {
        match self.store.get(CHAT_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Chat>(value) {
                Ok(chat) if chat.is_well_formed() => chat,
                Ok(_) => {
                    log::warn!("chat record is malformed, starting fresh");
                    Chat::default()
                }
                Err(error) => {
                    log::warn!("chat record is corrupt, starting fresh: {error}");
                    Chat::default()
                }
            },
            Ok(None) => Chat::default(),
            Err(error) => {
                log::warn!("failed to load chat record, starting fresh: {error}");
                Chat::default()
            }
        }
    }

    pub async fn load_settings(&self) -> Settings {
        match self.store.get(SETTINGS_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|error| {
                log::warn!("settings record is corrupt, using defaults: {error}");
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(error) => {
                log::warn!("failed to load settings record, using defaults: {error}");
                Settings::default()
            }
        }
    }

    pub async fn save_chat(&self, chat: &Chat) -> Result<()> {
        let value = serde_json::to_value(chat)?;
        let _gate = self.write_gate.lock().await;
        self.store.set(CHAT_KEY, value).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let value = serde_json::to_value(settings)?;
        let _gate = self.write_gate.lock().await;
        self.store.set(SETTINGS_KEY, value).await
    }
}
