//! Core data types for query results and errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A result column as reported by the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Warehouse type name (`LONG`, `DOUBLE`, `STRING`, ...) when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
        }
    }

    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
        }
    }
}

/// Row/column summary attached to every result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
}

/// Tabular data returned by one statement.
///
/// Rows are positionally aligned with `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Build a result from column names and rows.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build a result from JSON objects. Column order follows the first record;
    /// keys missing from later records become null.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Self {
        let columns: Vec<Column> = records
            .first()
            .map(|r| r.keys().map(Column::new).collect())
            .unwrap_or_default();

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(&c.name).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Row/column summary.
    pub fn metadata(&self) -> ResultMetadata {
        ResultMetadata {
            row_count: self.row_count(),
            column_count: self.column_count(),
            columns: self.column_names(),
        }
    }

    /// Value at a row for a named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// One row as an ordered column → value map.
    pub fn record(&self, row: usize) -> Option<Map<String, Value>> {
        let values = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .zip(values.iter())
                .map(|(c, v)| (c.name.clone(), v.clone()))
                .collect(),
        )
    }

    /// Every row as an ordered column → value map.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        (0..self.rows.len()).filter_map(|i| self.record(i)).collect()
    }

    /// First `n` rows, same columns.
    pub fn head(&self, n: usize) -> QueryResult {
        QueryResult {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// Errors that can occur in the analytics library.
#[derive(thiserror::Error, Debug)]
pub enum AnalyticsError {
    /// A required environment value is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Handshake or authentication with the warehouse failed.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unknown query type: {name}. Available query types: {}", available.join(", "))]
    UnknownQueryName { name: String, available: Vec<String> },

    /// The warehouse rejected or failed the statement.
    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<csv::Error> for AnalyticsError {
    fn from(e: csv::Error) -> Self {
        AnalyticsError::Export(e.to_string())
    }
}

/// Convenience result type.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
