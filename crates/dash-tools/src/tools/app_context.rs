use async_trait::async_trait;
use serde_json::json;

use dash_core::{Tool, ToolError, ToolOutput};

use crate::context::AppContext;

/// Reads the current page, datasource, time range, and panel titles so the
/// model can answer "what am I looking at" questions without guessing.
pub struct GetContextTool {
    context: AppContext,
}

impl GetContextTool {
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for GetContextTool {
    fn name(&self) -> &str {
        "get_context"
    }

    fn description(&self) -> &str {
        "Introspect the user's current location: app, page, selected datasource, time range, and visible panel titles."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let snapshot = self.context.snapshot().await;
        let content = serde_json::to_string(&snapshot)
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolOutput::text(content))
    }
}
