use crate::config::ServerConfig;
use crate::error::{Result, StatusboardError};
use crate::source::StatusSource;
use crate::status::{Status, StatusTable};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Shared HTTP client for the dashboard's status endpoints
pub struct HttpStatusClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        trace!("GET {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Server health check; the response body is the status label
pub struct HealthCheckSource {
    client: Arc<HttpStatusClient>,
    path: String,
}

impl HealthCheckSource {
    pub fn new<P: Into<String>>(client: Arc<HttpStatusClient>, path: P) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for HealthCheckSource {
    fn name(&self) -> &str {
        "server"
    }

    async fn sample(&self) -> Result<Status> {
        let body = self.client.get_text(&self.path).await?;
        let label = parse_label(self.name(), &body)?;
        debug!("Server health check returned '{}'", label);
        Ok(Status::Label(label))
    }
}

/// Run or validation status endpoint returning a JSON table
pub struct TableSource {
    name: String,
    client: Arc<HttpStatusClient>,
    path: String,
}

impl TableSource {
    pub fn new<S: Into<String>, P: Into<String>>(
        name: S,
        client: Arc<HttpStatusClient>,
        path: P,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for TableSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample(&self) -> Result<Status> {
        let body = self.client.get_text(&self.path).await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| StatusboardError::malformed(self.name.clone(), e.to_string()))?;
        let rows = parse_table(&self.name, value)?;
        debug!("{} returned {} row(s)", self.name, rows.len());
        Ok(Status::Table(rows))
    }
}

/// Accepts either a bare label or a JSON string literal
pub fn parse_label(source_name: &str, body: &str) -> Result<String> {
    let trimmed = body.trim();
    let label = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(label)) => label,
        _ => trimmed.to_string(),
    };

    if label.is_empty() {
        return Err(StatusboardError::malformed(source_name, "empty status label"));
    }
    Ok(label)
}

/// Convert a JSON array of arrays into rows of display cells
pub fn parse_table(source_name: &str, value: Value) -> Result<StatusTable> {
    let Value::Array(rows) = value else {
        return Err(StatusboardError::malformed(source_name, "expected an array of rows"));
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Array(cells) => Ok(cells.into_iter().map(cell_to_string).collect()),
            other => Err(StatusboardError::malformed(
                source_name,
                format!("row {} is not an array: {}", index, other),
            )),
        })
        .collect()
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}
