//! SQL warehouse access.
//!
//! [`SqlService`] is the "run this statement, get rows back" seam used by the
//! rest of the crate. [`DatabricksConnector`] produces one backed by the
//! Databricks SQL Statement Execution REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Number, Value};

use crate::config::WarehouseConfig;
use crate::types::{AnalyticsError, AnalyticsResult, Column, QueryResult};

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";
const WAREHOUSES_PATH: &str = "/api/2.0/sql/warehouses";

/// Something that executes SQL and returns tabular rows.
#[async_trait]
pub trait SqlService: Send + Sync {
    async fn execute(&self, sql: &str) -> AnalyticsResult<QueryResult>;
}

/// Establishes a [`SqlService`] from configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a handle, failing with a connection error when the service
    /// cannot be reached or rejects the credentials.
    async fn connect(&self, config: &WarehouseConfig) -> AnalyticsResult<Arc<dyn SqlService>>;
}

/// Connects to a Databricks SQL warehouse over HTTPS.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabricksConnector;

#[async_trait]
impl Connector for DatabricksConnector {
    async fn connect(&self, config: &WarehouseConfig) -> AnalyticsResult<Arc<dyn SqlService>> {
        let client = StatementClient::new(config)?;
        client.handshake().await?;
        Ok(Arc::new(client))
    }
}

/// Client for the statement execution endpoints of one warehouse.
#[derive(Debug, Clone)]
pub struct StatementClient {
    http: reqwest::Client,
    base_url: String,
    warehouse_id: String,
    token: Option<String>,
    wait_timeout: Duration,
    poll_interval: Duration,
    query_timeout: Duration,
}

impl StatementClient {
    pub fn new(config: &WarehouseConfig) -> AnalyticsResult<Self> {
        let warehouse_id = config.require_warehouse_id()?.to_string();
        let base_url = config.require_host()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("loan-analytics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyticsError::Connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            warehouse_id,
            token: config.token.clone(),
            wait_timeout: config.wait_timeout,
            poll_interval: config.poll_interval,
            query_timeout: config.query_timeout,
        })
    }

    pub fn warehouse_id(&self) -> &str {
        &self.warehouse_id
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Confirm the warehouse exists and the token is accepted.
    pub async fn handshake(&self) -> AnalyticsResult<()> {
        let url = format!("{}{}/{}", self.base_url, WAREHOUSES_PATH, self.warehouse_id);
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| AnalyticsError::Connection(format!("Failed to reach {}: {e}", self.base_url)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalyticsError::Connection(format!(
                "Warehouse {} rejected connection ({status}): {}",
                self.warehouse_id,
                service_message(&body)
            )));
        }

        let info: Value = resp.json().await.unwrap_or(Value::Null);
        let name = info
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&self.warehouse_id);
        let state = info.get("state").and_then(Value::as_str).unwrap_or("unknown");
        tracing::info!("Connected to warehouse {name} (state: {state})");
        Ok(())
    }

    async fn submit(&self, sql: &str) -> AnalyticsResult<StatementResponse> {
        let body = json!({
            "statement": sql,
            "warehouse_id": self.warehouse_id,
            "wait_timeout": wait_timeout_param(self.wait_timeout),
            "on_wait_timeout": "CONTINUE",
            "disposition": "INLINE",
            "format": "JSON_ARRAY",
        });
        let url = format!("{}{}", self.base_url, STATEMENTS_PATH);
        let resp = self.authed(self.http.post(&url).json(&body)).send().await;
        read_json(resp).await
    }

    async fn poll(&self, statement_id: &str) -> AnalyticsResult<StatementResponse> {
        let url = format!("{}{}/{}", self.base_url, STATEMENTS_PATH, statement_id);
        let resp = self.authed(self.http.get(&url)).send().await;
        read_json(resp).await
    }

    async fn fetch_chunk(&self, link: &str) -> AnalyticsResult<ResultChunk> {
        let url = format!("{}{}", self.base_url, link);
        let resp = self.authed(self.http.get(&url)).send().await;
        read_json(resp).await
    }

    async fn cancel(&self, statement_id: &str) {
        let url = format!("{}{}/{}/cancel", self.base_url, STATEMENTS_PATH, statement_id);
        if let Err(e) = self.authed(self.http.post(&url)).send().await {
            tracing::warn!("Failed to cancel statement {statement_id}: {e}");
        }
    }

    /// Wait until the statement leaves `PENDING`/`RUNNING`.
    async fn wait_for_completion(&self, mut resp: StatementResponse) -> AnalyticsResult<StatementResponse> {
        let started = tokio::time::Instant::now();

        while resp.state().is_in_progress() {
            let Some(id) = resp.statement_id.clone() else {
                return Err(AnalyticsError::Execution(
                    "Statement is still running but has no statement id".to_string(),
                ));
            };

            if started.elapsed() >= self.query_timeout {
                self.cancel(&id).await;
                return Err(AnalyticsError::Execution(format!(
                    "Statement {id} did not finish within {}s",
                    self.query_timeout.as_secs()
                )));
            }

            tracing::debug!("Statement {id} is {:?}, polling", resp.state());
            tokio::time::sleep(self.poll_interval).await;
            resp = self.poll(&id).await?;
        }

        Ok(resp)
    }
}

#[async_trait]
impl SqlService for StatementClient {
    async fn execute(&self, sql: &str) -> AnalyticsResult<QueryResult> {
        let submitted = self.submit(sql).await?;
        let resp = self.wait_for_completion(submitted).await?;

        match resp.state() {
            StatementState::Succeeded => {}
            state => {
                let message = resp
                    .status
                    .as_ref()
                    .and_then(|s| s.error.as_ref())
                    .and_then(|e| e.message.clone())
                    .unwrap_or_else(|| format!("statement finished in state {state:?}"));
                return Err(AnalyticsError::Execution(message));
            }
        }

        let columns: Vec<Column> = resp
            .manifest
            .map(|m| {
                let mut cols = m.schema.columns;
                cols.sort_by_key(|c| c.position.unwrap_or(usize::MAX));
                cols.into_iter()
                    .map(|c| Column {
                        name: c.name,
                        type_name: c.type_name,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut rows = Vec::new();
        let mut next = match resp.result {
            Some(chunk) => {
                rows.extend(typed_rows(&columns, chunk.data_array.unwrap_or_default()));
                chunk.next_chunk_internal_link
            }
            None => None,
        };

        while let Some(link) = next {
            tracing::debug!("Fetching result chunk {link}");
            let chunk = self.fetch_chunk(&link).await?;
            rows.extend(typed_rows(&columns, chunk.data_array.unwrap_or_default()));
            next = chunk.next_chunk_internal_link;
        }

        Ok(QueryResult::new(columns, rows))
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: Option<String>,
    status: Option<StatementStatus>,
    manifest: Option<Manifest>,
    result: Option<ResultChunk>,
}

impl StatementResponse {
    fn state(&self) -> StatementState {
        self.status
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(StatementState::Unknown)
    }
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: StatementState,
    error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
    #[serde(other)]
    Unknown,
}

impl StatementState {
    fn is_in_progress(self) -> bool {
        matches!(self, StatementState::Pending | StatementState::Running)
    }
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[allow(dead_code)]
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    schema: ManifestSchema,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestSchema {
    #[serde(default)]
    columns: Vec<ManifestColumn>,
}

#[derive(Debug, Deserialize)]
struct ManifestColumn {
    name: String,
    type_name: Option<String>,
    position: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ResultChunk {
    data_array: Option<Vec<Vec<Option<String>>>>,
    next_chunk_internal_link: Option<String>,
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: Result<reqwest::Response, reqwest::Error>,
) -> AnalyticsResult<T> {
    let resp = resp.map_err(|e| AnalyticsError::Execution(format!("Request failed: {e}")))?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AnalyticsError::Execution(format!("Failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(AnalyticsError::Execution(format!(
            "Warehouse returned {status}: {}",
            service_message(&body)
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| AnalyticsError::Execution(format!("Malformed warehouse response: {e}")))
}

/// The `message` field of an error body, or the raw body.
fn service_message(body: &str) -> String {
    serde_json::from_str::<ServiceError>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string())
}

/// `wait_timeout` must be `0s` or between 5 and 50 seconds.
fn wait_timeout_param(wait: Duration) -> String {
    let secs = wait.as_secs();
    if secs == 0 {
        "0s".to_string()
    } else {
        format!("{}s", secs.clamp(5, 50))
    }
}

fn typed_rows(columns: &[Column], data: Vec<Vec<Option<String>>>) -> impl Iterator<Item = Vec<Value>> + '_ {
    data.into_iter().map(move |row| {
        row.into_iter()
            .enumerate()
            .map(|(i, raw)| {
                let type_name = columns.get(i).and_then(|c| c.type_name.as_deref());
                typed_value(raw, type_name)
            })
            .collect()
    })
}

/// Convert a string cell to JSON using the manifest type name.
pub fn typed_value(raw: Option<String>, type_name: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };

    let kind = type_name.unwrap_or("STRING").to_ascii_uppercase();
    match kind.as_str() {
        "BYTE" | "SHORT" | "INT" | "LONG" => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(raw)),
        "FLOAT" | "DOUBLE" | "DECIMAL" => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(raw)),
        "BOOLEAN" => match raw.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw),
        },
        _ => Value::String(raw),
    }
}
