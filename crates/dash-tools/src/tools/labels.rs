use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use dash_core::{Tool, ToolError, ToolOutput};

use crate::backend::ObservabilityBackend;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelNamesArgs {
    /// Datasource to inspect.
    pub datasource_uid: String,
}

/// Lists metric label names available in a datasource.
pub struct ListLabelNamesTool {
    backend: Arc<dyn ObservabilityBackend>,
}

impl ListLabelNamesTool {
    pub fn new(backend: Arc<dyn ObservabilityBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListLabelNamesTool {
    fn name(&self) -> &str {
        "list_label_names"
    }

    fn description(&self) -> &str {
        "List the label names available in a metrics datasource. Useful for discovering what to filter or group by."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "datasource_uid": {
                    "type": "string",
                    "description": "The uid of the datasource to inspect"
                }
            },
            "required": ["datasource_uid"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: LabelNamesArgs = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let names = self
            .backend
            .label_names(&args.datasource_uid)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(ToolOutput::text(names.join(", ")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelValuesArgs {
    pub datasource_uid: String,
    /// Label whose values to list, e.g. "instance".
    pub label: String,
}

/// Lists the values of one label in a datasource.
pub struct ListLabelValuesTool {
    backend: Arc<dyn ObservabilityBackend>,
}

impl ListLabelValuesTool {
    pub fn new(backend: Arc<dyn ObservabilityBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListLabelValuesTool {
    fn name(&self) -> &str {
        "list_label_values"
    }

    fn description(&self) -> &str {
        "List the values of a single label in a metrics datasource, e.g. every value of 'instance'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "datasource_uid": {
                    "type": "string",
                    "description": "The uid of the datasource to inspect"
                },
                "label": {
                    "type": "string",
                    "description": "The label name whose values to list"
                }
            },
            "required": ["datasource_uid", "label"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: LabelValuesArgs = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let values = self
            .backend
            .label_values(&args.datasource_uid, &args.label)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(ToolOutput::text(values.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::FakeBackend;

    #[tokio::test]
    async fn label_names_joined_as_content() {
        let backend = Arc::new(
            FakeBackend::with_datasource("a", "Prom", "prometheus")
                .labels(vec!["job", "instance"]),
        );
        let tool = ListLabelNamesTool::new(backend);

        let output = tool
            .execute(json!({"datasource_uid": "a"}))
            .await
            .expect("execute");

        assert_eq!(output.content, "job, instance");
    }

    #[tokio::test]
    async fn malformed_args_are_invalid_arguments() {
        let backend = Arc::new(FakeBackend::default());
        let tool = ListLabelValuesTool::new(backend);

        let error = tool.execute(json!({"label": "job"})).await.unwrap_err();
        assert!(matches!(error, ToolError::InvalidArguments(_)));
    }
}
