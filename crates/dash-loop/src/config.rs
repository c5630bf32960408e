pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Dash, an assistant embedded in an observability \
platform. You help users query metrics and logs, inspect their dashboards, and build panels. \
Use the available tools to look at real data instead of guessing, and prefer small, targeted \
queries.";

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ceiling on tool-calling rounds per turn; the loop stops issuing tool
    /// calls once it is reached even if the model keeps requesting them.
    pub max_rounds: usize,
    pub system_prompt: String,
    /// Model name, for logging only.
    pub model_name: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: 20,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model_name: None,
        }
    }
}
