pub mod app_context;
pub mod dashboard;
pub mod datasources;
pub mod labels;
pub mod logs;
pub mod metrics;
pub mod navigate;

#[cfg(test)]
pub mod test_support;

use std::sync::Arc;

use dash_core::{RegistryError, ToolRegistry};

use crate::backend::ObservabilityBackend;
use crate::context::{AppContext, DashboardState};

pub use app_context::GetContextTool;
pub use dashboard::AddDashboardVariableTool;
pub use datasources::ListDatasourcesTool;
pub use labels::{ListLabelNamesTool, ListLabelValuesTool};
pub use logs::QueryLogsTool;
pub use metrics::QueryMetricsTool;
pub use navigate::NavigateTool;

/// Registers the full built-in tool set against one backend and the host
/// state handles.
pub fn register_builtin_tools(
    registry: &ToolRegistry,
    backend: Arc<dyn ObservabilityBackend>,
    context: AppContext,
    dashboard: DashboardState,
) -> Result<(), RegistryError> {
    registry.register(ListDatasourcesTool::new(Arc::clone(&backend)))?;
    registry.register(ListLabelNamesTool::new(Arc::clone(&backend)))?;
    registry.register(ListLabelValuesTool::new(Arc::clone(&backend)))?;
    registry.register(QueryMetricsTool::new(Arc::clone(&backend)))?;
    registry.register(QueryLogsTool::new(backend))?;
    registry.register(AddDashboardVariableTool::new(dashboard))?;
    registry.register(NavigateTool::new(context.clone()))?;
    registry.register(GetContextTool::new(context))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::FakeBackend;

    #[test]
    fn builtin_registration_covers_all_tools() {
        let registry = ToolRegistry::new();
        register_builtin_tools(
            &registry,
            Arc::new(FakeBackend::default()),
            AppContext::default(),
            DashboardState::default(),
        )
        .expect("register");

        let names: Vec<String> = registry
            .schemas()
            .into_iter()
            .map(|s| s.function.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "add_dashboard_variable",
                "get_context",
                "list_datasources",
                "list_label_names",
                "list_label_values",
                "navigate",
                "query_logs",
                "query_metrics",
            ]
        );
    }
}
