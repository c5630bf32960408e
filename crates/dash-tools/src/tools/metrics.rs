use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use dash_core::{Tool, ToolError, ToolOutput};

use crate::backend::{ObservabilityBackend, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    #[default]
    Instant,
    Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetricsArgs {
    pub datasource_uid: String,
    /// PromQL expression to evaluate.
    pub expr: String,
    #[serde(default)]
    pub kind: QueryKind,
    /// Evaluation time (instant) in unix seconds; server-side now if omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Range start in unix seconds (range queries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    /// Range end in unix seconds (range queries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(default = "default_step")]
    pub step_seconds: u64,
}

fn default_step() -> u64 {
    60
}

/// Evaluates a PromQL expression, instant or over a range. The raw result
/// frame rides along as an artifact so the host can chart it.
pub struct QueryMetricsTool {
    backend: Arc<dyn ObservabilityBackend>,
}

impl QueryMetricsTool {
    pub fn new(backend: Arc<dyn ObservabilityBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for QueryMetricsTool {
    fn name(&self) -> &str {
        "query_metrics"
    }

    fn description(&self) -> &str {
        "Evaluate a PromQL expression against a metrics datasource. Use kind 'instant' for a point-in-time value and 'range' (with start/end unix seconds) for a series over time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "datasource_uid": {
                    "type": "string",
                    "description": "The uid of the metrics datasource"
                },
                "expr": {
                    "type": "string",
                    "description": "The PromQL expression to evaluate"
                },
                "kind": {
                    "type": "string",
                    "enum": ["instant", "range"],
                    "description": "Query kind; defaults to instant"
                },
                "time": {
                    "type": "integer",
                    "description": "Instant evaluation time, unix seconds"
                },
                "start": {
                    "type": "integer",
                    "description": "Range start, unix seconds"
                },
                "end": {
                    "type": "integer",
                    "description": "Range end, unix seconds"
                },
                "step_seconds": {
                    "type": "integer",
                    "description": "Range resolution step in seconds, default 60"
                }
            },
            "required": ["datasource_uid", "expr"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: QueryMetricsArgs = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let result = match args.kind {
            QueryKind::Instant => self
                .backend
                .query_instant(&args.datasource_uid, &args.expr, args.time)
                .await,
            QueryKind::Range => {
                let (Some(start), Some(end)) = (args.start, args.end) else {
                    return Err(ToolError::InvalidArguments(
                        "range queries need both 'start' and 'end'".to_string(),
                    ));
                };
                self.backend
                    .query_range(
                        &args.datasource_uid,
                        &args.expr,
                        TimeRange {
                            from: start,
                            to: end,
                        },
                        args.step_seconds,
                    )
                    .await
            }
        }
        .map_err(|e| ToolError::Execution(e.to_string()))?;

        let content =
            serde_json::to_string(&result).map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolOutput::with_artifact(content, result))
    }
}
