use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use dash_core::{Tool, ToolError, ToolOutput};

use crate::context::{DashboardState, DashboardVariable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddVariableArgs {
    /// Variable name, referenced as `$name` in queries.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Query that produces the variable's options.
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource_uid: Option<String>,
}

/// Adds a template variable to the current dashboard. The variable
/// definition rides along as an artifact so the host can apply it.
pub struct AddDashboardVariableTool {
    dashboard: DashboardState,
}

impl AddDashboardVariableTool {
    pub fn new(dashboard: DashboardState) -> Self {
        Self { dashboard }
    }
}

#[async_trait]
impl Tool for AddDashboardVariableTool {
    fn name(&self) -> &str {
        "add_dashboard_variable"
    }

    fn description(&self) -> &str {
        "Add a template variable to the current dashboard, defined by a query such as label_values(up, instance)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Variable name, referenced as $name in queries"
                },
                "label": {
                    "type": "string",
                    "description": "Optional display label"
                },
                "query": {
                    "type": "string",
                    "description": "Query producing the variable options"
                },
                "datasource_uid": {
                    "type": "string",
                    "description": "Datasource the query runs against"
                }
            },
            "required": ["name", "query"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: AddVariableArgs = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let variable = DashboardVariable {
            name: args.name,
            label: args.label,
            query: args.query,
            datasource_uid: args.datasource_uid,
        };

        self.dashboard
            .add_variable(variable.clone())
            .await
            .map_err(ToolError::Execution)?;

        let artifact =
            serde_json::to_value(&variable).map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(ToolOutput::with_artifact(
            format!("Added dashboard variable '{}'.", variable.name),
            artifact,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adds_variable_and_returns_definition_artifact() {
        let dashboard = DashboardState::default();
        let tool = AddDashboardVariableTool::new(dashboard.clone());

        let output = tool
            .execute(json!({
                "name": "instance",
                "query": "label_values(up, instance)"
            }))
            .await
            .expect("execute");

        assert!(output.content.contains("instance"));
        assert_eq!(output.artifact.as_ref().unwrap()["name"], "instance");
        assert_eq!(dashboard.variables().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_variable_fails_execution() {
        let dashboard = DashboardState::default();
        let tool = AddDashboardVariableTool::new(dashboard);
        let input = json!({"name": "job", "query": "label_values(job)"});

        tool.execute(input.clone()).await.expect("first add");
        let error = tool.execute(input).await.unwrap_err();

        assert!(matches!(error, ToolError::Execution(message) if message.contains("already exists")));
    }
}
