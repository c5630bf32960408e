use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use dash_core::{Tool, ToolError, ToolOutput};

use crate::backend::{ObservabilityBackend, TimeRange};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogsArgs {
    pub datasource_uid: String,
    /// LogQL expression, e.g. `{app="api"} |= "error"`.
    pub expr: String,
    pub start: i64,
    pub end: i64,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// Runs a LogQL query over a time range.
pub struct QueryLogsTool {
    backend: Arc<dyn ObservabilityBackend>,
}

impl QueryLogsTool {
    pub fn new(backend: Arc<dyn ObservabilityBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for QueryLogsTool {
    fn name(&self) -> &str {
        "query_logs"
    }

    fn description(&self) -> &str {
        "Run a LogQL expression against a logs datasource over a time range, returning up to 'limit' log lines (default 100)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "datasource_uid": {
                    "type": "string",
                    "description": "The uid of the logs datasource"
                },
                "expr": {
                    "type": "string",
                    "description": "The LogQL expression to run"
                },
                "start": {
                    "type": "integer",
                    "description": "Range start, unix seconds"
                },
                "end": {
                    "type": "integer",
                    "description": "Range end, unix seconds"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of log lines, default 100"
                }
            },
            "required": ["datasource_uid", "expr", "start", "end"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: QueryLogsArgs = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let result = self
            .backend
            .query_logs(
                &args.datasource_uid,
                &args.expr,
                TimeRange {
                    from: args.start,
                    to: args.end,
                },
                args.limit,
            )
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let content =
            serde_json::to_string(&result).map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolOutput::with_artifact(content, result))
    }
}
