pub mod conversation;
pub mod error;
pub mod events;
pub mod message;
pub mod settings;
pub mod tool;
pub mod ui;

pub use conversation::{Chat, Conversation, CANCELLED_BY_USER};
pub use error::AgentError;
pub use events::AgentEvent;
pub use message::{history_is_consistent, ModelMessage, ToolCall};
pub use settings::{DisplayMode, Settings, Verbosity};
pub use tool::{
    FunctionSchema, Invocation, RegistryError, SharedTool, Tool, ToolError, ToolOutput,
    ToolRegistry, ToolSchema,
};
pub use ui::{Sender, ToolUiState, UiMessage};
