//! Shared handles onto host-app state.
//!
//! The dashboard UI owns these for real; the agent core only reads the app
//! context and records requested mutations (variables, navigation) on them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::backend::TimeRange;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PageContext {
    pub app: String,
    pub page: String,
    pub datasource_uid: Option<String>,
    pub time_range: Option<TimeRange>,
    pub panel_titles: Vec<String>,
}

/// Read-mostly snapshot of where the user currently is. Navigation performed
/// through the agent is recorded here; the host applies it.
#[derive(Clone, Default)]
pub struct AppContext {
    inner: Arc<RwLock<PageContext>>,
}

impl AppContext {
    pub fn new(initial: PageContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn snapshot(&self) -> PageContext {
        self.inner.read().await.clone()
    }

    pub async fn set_page(&self, app: impl Into<String>, page: impl Into<String>) {
        let mut ctx = self.inner.write().await;
        ctx.app = app.into();
        ctx.page = page.into();
    }

    pub async fn update(&self, apply: impl FnOnce(&mut PageContext)) {
        apply(&mut *self.inner.write().await);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardVariable {
    pub name: String,
    pub label: Option<String>,
    pub query: String,
    pub datasource_uid: Option<String>,
}

/// The piece of dashboard state the agent may mutate: template variables.
#[derive(Clone, Default)]
pub struct DashboardState {
    variables: Arc<RwLock<Vec<DashboardVariable>>>,
}

impl DashboardState {
    pub async fn add_variable(&self, variable: DashboardVariable) -> Result<(), String> {
        let mut variables = self.variables.write().await;
        if variables.iter().any(|v| v.name == variable.name) {
            return Err(format!("variable '{}' already exists", variable.name));
        }
        variables.push(variable);
        Ok(())
    }

    pub async fn variables(&self) -> Vec<DashboardVariable> {
        self.variables.read().await.clone()
    }
}
