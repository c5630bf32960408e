use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use dash_core::{Tool, ToolError, ToolOutput};

use crate::context::AppContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateArgs {
    /// Target app section, e.g. "dashboards" or "alerting".
    pub app: String,
    pub page: String,
    /// Must be true, and only after the user confirmed the navigation in
    /// this turn. Without it the tool refuses.
    #[serde(default)]
    pub navigate: bool,
}

/// Navigates the host UI. Never moves the user implicitly: the model must
/// pass `navigate: true`, which the host only sets after explicit user
/// confirmation in the same turn.
pub struct NavigateTool {
    context: AppContext,
}

impl NavigateTool {
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for NavigateTool {
    fn name(&self) -> &str {
        "navigate"
    }

    fn description(&self) -> &str {
        "Navigate the user to another app page. Requires explicit user confirmation: only call with navigate=true after the user has agreed to go there."
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "app": {
                    "type": "string",
                    "description": "Target app section, e.g. dashboards, alerting, explore"
                },
                "page": {
                    "type": "string",
                    "description": "Target page within the app"
                },
                "navigate": {
                    "type": "boolean",
                    "description": "Set true only after the user confirmed the navigation"
                }
            },
            "required": ["app", "page"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: NavigateArgs = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        if !args.navigate {
            return Err(ToolError::Execution(
                "navigation not confirmed: ask the user first, then call again with navigate=true"
                    .to_string(),
            ));
        }

        self.context.set_page(args.app.clone(), args.page.clone()).await;
        Ok(ToolOutput::text(format!(
            "Navigated to {}/{}.",
            args.app, args.page
        )))
    }
}
