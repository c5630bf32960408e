use serde::{Deserialize, Serialize};

/// How much the assistant explains itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Concise,
    Educational,
}

impl Verbosity {
    /// The system instruction re-injected into the model history whenever the
    /// setting changes mid-conversation.
    pub fn instruction(&self) -> &'static str {
        match self {
            Verbosity::Concise => {
                "Answer concisely. Skip explanations of query syntax unless asked."
            }
            Verbosity::Educational => {
                "Explain your reasoning and the queries you run so the user can learn from them."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Docked,
    Sidebar,
}

/// Per-profile assistant configuration, loaded once at startup and persisted
/// fire-and-forget on every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub verbosity: Verbosity,
    pub show_tool_calls: bool,
    pub display_mode: DisplayMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Concise,
            show_tool_calls: true,
            display_mode: DisplayMode::Docked,
        }
    }
}
