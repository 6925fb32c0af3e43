//! Lazily established, time-limited warehouse handle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::{WarehouseConfig, DEFAULT_CONNECTION_TTL_SECS};
use crate::report::{Status, StatusSink};
use crate::types::{AnalyticsError, AnalyticsResult, QueryResult};
use crate::warehouse::{Connector, DatabricksConnector, SqlService};

/// One row of `DESCRIBE TABLE` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: Option<String>,
    pub comment: Option<String>,
}

struct CachedHandle {
    service: Arc<dyn SqlService>,
    created: Instant,
}

/// Hands out a shared [`SqlService`], reconnecting once the TTL has elapsed.
pub struct ConnectionProvider {
    config: WarehouseConfig,
    connector: Box<dyn Connector>,
    ttl: Duration,
    slot: Mutex<Option<CachedHandle>>,
}

impl ConnectionProvider {
    pub fn new(config: WarehouseConfig, connector: Box<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            ttl: Duration::from_secs(DEFAULT_CONNECTION_TTL_SECS),
            slot: Mutex::new(None),
        }
    }

    /// Provider for a Databricks warehouse.
    pub fn databricks(config: WarehouseConfig) -> Self {
        Self::new(config, Box::new(DatabricksConnector))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Current handle, connecting if there is none or it has expired.
    pub async fn get_connection(&self) -> AnalyticsResult<Arc<dyn SqlService>> {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.as_ref() {
            if handle.created.elapsed() < self.ttl {
                return Ok(handle.service.clone());
            }
            tracing::debug!("Warehouse connection expired, reconnecting");
        }
        *slot = None;

        self.config.require_warehouse_id()?;

        match self.connector.connect(&self.config).await {
            Ok(service) => {
                *slot = Some(CachedHandle {
                    service: service.clone(),
                    created: Instant::now(),
                });
                Ok(service)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to warehouse: {e}");
                Err(match e {
                    AnalyticsError::Configuration(_) | AnalyticsError::Connection(_) => e,
                    other => AnalyticsError::Connection(other.to_string()),
                })
            }
        }
    }

    /// Drop the cached handle so the next call reconnects.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            tracing::info!("Warehouse connection cleared");
        }
    }

    /// Whether a live handle is cached. Never waits: a handshake in
    /// progress reads as not connected.
    pub fn is_connected(&self) -> bool {
        self.slot
            .try_lock()
            .is_ok_and(|slot| slot.as_ref().is_some_and(|h| h.created.elapsed() < self.ttl))
    }

    /// Execute a statement, propagating every failure.
    pub async fn run(&self, sql: &str) -> AnalyticsResult<QueryResult> {
        let service = self.get_connection().await?;
        tracing::debug!("Executing SQL: {}", sql.trim());
        service.execute(sql).await.map_err(|e| match e {
            AnalyticsError::Execution(_) => e,
            other => AnalyticsError::Execution(other.to_string()),
        })
    }

    /// Execute a statement, reporting a failure to `sink` instead of returning it.
    pub async fn execute(&self, sql: &str, sink: &dyn StatusSink) -> Option<QueryResult> {
        match self.run(sql).await {
            Ok(result) => Some(result),
            Err(e) => {
                sink.report(Status::error(e.to_string()));
                None
            }
        }
    }

    /// Column layout of a table as reported by the warehouse.
    pub async fn describe_table(&self, table: &str) -> AnalyticsResult<Vec<ColumnDescriptor>> {
        let result = self.run(&format!("DESCRIBE TABLE {table}")).await?;
        Ok(parse_describe(&result))
    }

    /// Whether a trivial statement round-trips.
    pub async fn test_connection(&self) -> bool {
        match self.run("SELECT 1 as test").await {
            Ok(result) => !result.is_empty(),
            Err(e) => {
                tracing::warn!("Connection test failed: {e}");
                false
            }
        }
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// Read `col_name`/`data_type`/`comment` rows up to the first blank or
/// `#`-prefixed section row (partition and detail sections follow it).
pub fn parse_describe(result: &QueryResult) -> Vec<ColumnDescriptor> {
    let mut columns = Vec::new();
    for row in 0..result.row_count() {
        let Some(name) = text(result.value(row, "col_name")) else {
            break;
        };
        if name.is_empty() || name.starts_with('#') {
            break;
        }
        columns.push(ColumnDescriptor {
            name,
            data_type: text(result.value(row, "data_type")).filter(|t| !t.is_empty()),
            comment: text(result.value(row, "comment")).filter(|c| !c.is_empty()),
        });
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use serde_json::json;

    fn describe_rows(rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult::new(
            vec![Column::new("col_name"), Column::new("data_type"), Column::new("comment")],
            rows,
        )
    }

    #[test]
    fn test_parse_describe_stops_at_section() {
        let result = describe_rows(vec![
            vec![json!("id"), json!("bigint"), Value::Null],
            vec![json!("balance"), json!("string"), json!("outstanding")],
            vec![json!(""), json!(""), json!("")],
            vec![json!("# Partition Information"), json!(""), json!("")],
            vec![json!("date"), json!("string"), Value::Null],
        ]);

        let cols = parse_describe(&result);
        let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "balance"]);
        assert_eq!(cols[0].data_type.as_deref(), Some("bigint"));
        assert_eq!(cols[1].comment.as_deref(), Some("outstanding"));
        assert!(cols[0].comment.is_none());
    }

    #[test]
    fn test_parse_describe_name_only() {
        let result = QueryResult::new(
            vec![Column::new("col_name")],
            vec![vec![json!("id")], vec![json!("balance")]],
        );
        let cols = parse_describe(&result);
        assert_eq!(cols.len(), 2);
        assert!(cols[1].data_type.is_none());
    }
}
