use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use dash_core::{Tool, ToolError, ToolOutput};

use crate::backend::ObservabilityBackend;

/// Lists the configured datasources so the model can pick one to query.
pub struct ListDatasourcesTool {
    backend: Arc<dyn ObservabilityBackend>,
}

impl ListDatasourcesTool {
    pub fn new(backend: Arc<dyn ObservabilityBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListDatasourcesTool {
    fn name(&self) -> &str {
        "list_datasources"
    }

    fn description(&self) -> &str {
        "List the configured datasources (name, uid, type). Call this before querying if you do not know which datasource to use."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let datasources = self
            .backend
            .list_datasources()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let content = serde_json::to_string(&datasources)
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolOutput::text(content))
    }
}
