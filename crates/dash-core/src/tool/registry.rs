use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::message::ToolCall;
use crate::tool::{validate_input, Tool, ToolError, ToolSchema};

pub type SharedTool = Arc<dyn Tool>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool with name '{0}' already registered")]
    DuplicateTool(String),

    #[error("invalid tool: {0}")]
    InvalidTool(String),
}

/// Outcome of a single tool dispatch. A failure is data the model reacts to,
/// not an error of the dispatch itself; only cancellation propagates as
/// `Err` out of [`ToolRegistry::invoke`].
#[derive(Debug, Clone)]
pub struct Invocation {
    pub content: String,
    pub artifact: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl Invocation {
    fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            content: format!("Error: {error}"),
            artifact: None,
            error: Some(error),
        }
    }
}

/// Live tool registry. Tools can be registered and deregistered at runtime;
/// the orchestrator reads a fresh schema snapshot at the start of every LLM
/// round rather than caching a bound copy.
pub struct ToolRegistry {
    tools: DashMap<String, SharedTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    pub fn register<T>(&self, tool: T) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        self.register_shared(Arc::new(tool))
    }

    pub fn register_shared(&self, tool: SharedTool) -> Result<(), RegistryError> {
        let name = tool.name().trim();

        if name.is_empty() {
            return Err(RegistryError::InvalidTool(
                "tool name cannot be empty".to_string(),
            ));
        }

        match self.tools.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateTool(name.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(tool);
                Ok(())
            }
        }
    }

    pub fn deregister(&self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<SharedTool> {
        self.tools.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Whether a tool demands explicit user confirmation before it runs.
    /// The host queries this when it surfaces a pending call; the registry
    /// never gates on it itself, confirming tools check their own input
    /// flag in `execute`.
    pub fn requires_confirmation(&self, name: &str) -> bool {
        self.get(name)
            .map(|tool| tool.requires_confirmation())
            .unwrap_or(false)
    }

    /// Sorted schema snapshot for the next LLM round.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .iter()
            .map(|entry| entry.value().to_schema())
            .collect();
        schemas.sort_by(|left, right| left.function.name.cmp(&right.function.name));
        schemas
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatches one tool call. Unknown tools, invalid input, and execution
    /// failures all come back as failure content for the model; a fired
    /// cancellation token aborts the in-flight execution and is the only
    /// `Err` this returns.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<Invocation, ToolError> {
        if cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let Some(tool) = self.get(&call.name) else {
            log::warn!("tool '{}' requested but not registered", call.name);
            return Ok(Invocation::failure(format!("unknown tool '{}'", call.name)));
        };

        if let Err(reason) = validate_input(&tool.parameters_schema(), &call.input) {
            return Ok(Invocation::failure(format!(
                "invalid input for '{}': {reason}",
                call.name
            )));
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
            outcome = tool.execute(call.input.clone()) => outcome,
        };

        match outcome {
            Ok(output) => Ok(Invocation {
                content: output.content,
                artifact: output.artifact,
                error: None,
            }),
            Err(ToolError::Cancelled) => Err(ToolError::Cancelled),
            // The UI shows the bare message the tool threw; the display
            // prefix would only repeat what the nested entry already says.
            Err(ToolError::Execution(message)) | Err(ToolError::InvalidArguments(message)) => {
                Ok(Invocation::failure(message))
            }
            Err(error) => Ok(Invocation::failure(error.to_string())),
        }
    }
}
