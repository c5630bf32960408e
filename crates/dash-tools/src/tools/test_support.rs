//! Scripted backend double shared by the tool tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::backend::{BackendError, Datasource, ObservabilityBackend, Result, TimeRange};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLogQuery {
    pub datasource_uid: String,
    pub expr: String,
    pub range: TimeRange,
    pub limit: u32,
}

#[derive(Default)]
pub struct FakeBackend {
    datasources: Vec<Datasource>,
    label_names: Vec<String>,
    label_values: Vec<String>,
    metric_result: Option<Value>,
    log_result: Option<Value>,
    failure: Option<String>,
    last_log_query: Mutex<Option<RecordedLogQuery>>,
}

impl FakeBackend {
    pub fn with_datasource(uid: &str, name: &str, kind: &str) -> Self {
        Self {
            datasources: vec![Datasource {
                uid: uid.to_string(),
                name: name.to_string(),
                kind: kind.to_string(),
            }],
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn labels(mut self, names: Vec<&str>) -> Self {
        self.label_names = names.into_iter().map(str::to_string).collect();
        self
    }

    pub fn metric_result(mut self, result: Value) -> Self {
        self.metric_result = Some(result);
        self
    }

    pub fn log_result(mut self, result: Value) -> Self {
        self.log_result = Some(result);
        self
    }

    pub async fn last_log_query(&self) -> Option<RecordedLogQuery> {
        self.last_log_query.lock().await.clone()
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(BackendError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObservabilityBackend for FakeBackend {
    async fn list_datasources(&self) -> Result<Vec<Datasource>> {
        self.check_failure()?;
        Ok(self.datasources.clone())
    }

    async fn label_names(&self, _datasource_uid: &str) -> Result<Vec<String>> {
        self.check_failure()?;
        Ok(self.label_names.clone())
    }

    async fn label_values(&self, _datasource_uid: &str, _label: &str) -> Result<Vec<String>> {
        self.check_failure()?;
        Ok(self.label_values.clone())
    }

    async fn query_instant(
        &self,
        _datasource_uid: &str,
        _expr: &str,
        _time: Option<i64>,
    ) -> Result<Value> {
        self.check_failure()?;
        Ok(self.metric_result.clone().unwrap_or_else(|| json!({})))
    }

    async fn query_range(
        &self,
        _datasource_uid: &str,
        _expr: &str,
        _range: TimeRange,
        _step_seconds: u64,
    ) -> Result<Value> {
        self.check_failure()?;
        Ok(self.metric_result.clone().unwrap_or_else(|| json!({})))
    }

    async fn query_logs(
        &self,
        datasource_uid: &str,
        expr: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Value> {
        self.check_failure()?;
        *self.last_log_query.lock().await = Some(RecordedLogQuery {
            datasource_uid: datasource_uid.to_string(),
            expr: expr.to_string(),
            range,
            limit,
        });
        Ok(self.log_result.clone().unwrap_or_else(|| json!({})))
    }
}
