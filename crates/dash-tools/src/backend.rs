//! The observability backend boundary.
//!
//! Tools never talk HTTP themselves; they go through this trait so tests can
//! substitute a scripted double. [`HttpBackend`] is the real implementation,
//! speaking to a Grafana-style API with per-datasource query proxying.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("backend error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Datasource {
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Absolute time range in unix seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

#[async_trait]
pub trait ObservabilityBackend: Send + Sync {
    async fn list_datasources(&self) -> Result<Vec<Datasource>>;

    async fn label_names(&self, datasource_uid: &str) -> Result<Vec<String>>;

    async fn label_values(&self, datasource_uid: &str, label: &str) -> Result<Vec<String>>;

    /// Instant metric query; `time` defaults to now on the server side.
    async fn query_instant(
        &self,
        datasource_uid: &str,
        expr: &str,
        time: Option<i64>,
    ) -> Result<Value>;

    async fn query_range(
        &self,
        datasource_uid: &str,
        expr: &str,
        range: TimeRange,
        step_seconds: u64,
    ) -> Result<Value>;

    async fn query_logs(
        &self,
        datasource_uid: &str,
        expr: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Value>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpBackend {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: url::Url::parse(base_url.as_ref())?,
        })
    }

    fn proxy_url(&self, datasource_uid: &str, api_path: &str) -> Result<url::Url> {
        Ok(self.base_url.join(&format!(
            "api/datasources/proxy/uid/{datasource_uid}/{api_path}"
        ))?)
    }

    async fn get_json(&self, url: url::Url, query: &[(&str, String)]) -> Result<Value> {
        let response = self.client.get(url).query(query).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(format!("HTTP {status}: {text}")));
        }
        Ok(response.json().await?)
    }

    fn string_array(value: &Value) -> Vec<String> {
        value
            .get("data")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObservabilityBackend for HttpBackend {
    async fn list_datasources(&self) -> Result<Vec<Datasource>> {
        let url = self.base_url.join("api/datasources")?;
        let value = self.get_json(url, &[]).await?;
        serde_json::from_value(value)
            .map_err(|error| BackendError::Api(format!("unexpected datasource list: {error}")))
    }

    async fn label_names(&self, datasource_uid: &str) -> Result<Vec<String>> {
        let url = self.proxy_url(datasource_uid, "api/v1/labels")?;
        Ok(Self::string_array(&self.get_json(url, &[]).await?))
    }

    async fn label_values(&self, datasource_uid: &str, label: &str) -> Result<Vec<String>> {
        let url = self.proxy_url(datasource_uid, &format!("api/v1/label/{label}/values"))?;
        Ok(Self::string_array(&self.get_json(url, &[]).await?))
    }

    async fn query_instant(
        &self,
        datasource_uid: &str,
        expr: &str,
        time: Option<i64>,
    ) -> Result<Value> {
        let url = self.proxy_url(datasource_uid, "api/v1/query")?;
        let mut query = vec![("query", expr.to_string())];
        if let Some(time) = time {
            query.push(("time", time.to_string()));
        }
        self.get_json(url, &query).await
    }

    async fn query_range(
        &self,
        datasource_uid: &str,
        expr: &str,
        range: TimeRange,
        step_seconds: u64,
    ) -> Result<Value> {
        let url = self.proxy_url(datasource_uid, "api/v1/query_range")?;
        let query = vec![
            ("query", expr.to_string()),
            ("start", range.from.to_string()),
            ("end", range.to.to_string()),
            ("step", step_seconds.to_string()),
        ];
        self.get_json(url, &query).await
    }

    async fn query_logs(
        &self,
        datasource_uid: &str,
        expr: &str,
        range: TimeRange,
        limit: u32,
    ) -> Result<Value> {
        let url = self.proxy_url(datasource_uid, "loki/api/v1/query_range")?;
        let query = vec![
            ("query", expr.to_string()),
            ("start", range.from.to_string()),
            ("end", range.to.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json(url, &query).await
    }
}
