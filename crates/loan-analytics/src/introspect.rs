//! Runtime comparison of the warehouse tables with the columns the queries expect.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::connection::ConnectionProvider;
use crate::report::{Status, StatusSink};
use crate::schema::{Table, TableNamespace};

/// Columns the loan queries read.
pub const LOAN_CHECKLIST: [&str; 6] = ["loan_amnt", "member_id", "loan_status", "grade", "purpose", "int_rate"];

/// Columns the transaction and accounting queries read.
pub const ACCOUNTING_CHECKLIST: [&str; 6] = ["balance", "base_rate", "accrued_interest", "type", "status", "date"];

/// First rows of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleData {
    pub columns: Vec<String>,
    /// First row, keyed by column in table order.
    pub first_row: Map<String, Value>,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPresence {
    pub field: &'static str,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChecklist {
    pub loan: Vec<FieldPresence>,
    pub accounting: Vec<FieldPresence>,
}

impl FieldChecklist {
    pub fn missing_loan_fields(&self) -> Vec<&'static str> {
        missing(&self.loan)
    }

    pub fn missing_accounting_fields(&self) -> Vec<&'static str> {
        missing(&self.accounting)
    }
}

fn missing(fields: &[FieldPresence]) -> Vec<&'static str> {
    fields.iter().filter(|f| !f.present).map(|f| f.field).collect()
}

/// What was observed for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub full_name: String,
    /// Observed column names; `None` when `DESCRIBE` failed.
    pub columns: Option<Vec<String>>,
    pub column_count: usize,
    pub sample: Option<SampleData>,
    pub checklist: FieldChecklist,
    pub has_loan_amnt: bool,
    pub has_balance: bool,
}

pub struct SchemaInspector {
    provider: Arc<ConnectionProvider>,
    namespace: TableNamespace,
    reporter: Arc<dyn StatusSink>,
}

impl SchemaInspector {
    pub fn new(
        provider: Arc<ConnectionProvider>,
        namespace: TableNamespace,
        reporter: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            provider,
            namespace,
            reporter,
        }
    }

    pub fn namespace(&self) -> &TableNamespace {
        &self.namespace
    }

    /// Column names of a fully-qualified table, or `None` with a warning.
    pub async fn table_columns(&self, table: &str) -> Option<Vec<String>> {
        match self.provider.describe_table(table).await {
            Ok(cols) if cols.is_empty() => {
                self.reporter
                    .report(Status::warning(format!("No columns reported for {table}")));
                None
            }
            Ok(cols) => Some(cols.into_iter().map(|c| c.name).collect()),
            Err(e) => {
                self.reporter
                    .report(Status::warning(format!("Could not get columns for {table}: {e}")));
                None
            }
        }
    }

    pub async fn validate_column_exists(&self, table: &str, column: &str) -> bool {
        self.table_columns(table)
            .await
            .is_some_and(|cols| cols.iter().any(|c| c == column))
    }

    /// `SELECT * ... LIMIT n`, or `None` with a warning.
    pub async fn sample(&self, table: &str, limit: usize) -> Option<SampleData> {
        let sql = format!("SELECT * FROM {table} LIMIT {limit}");
        match self.provider.run(&sql).await {
            Ok(result) => {
                let first_row = result.record(0)?;
                Some(SampleData {
                    columns: result.column_names(),
                    first_row,
                    row_count: result.row_count(),
                })
            }
            Err(e) => {
                self.reporter
                    .report(Status::warning(format!("Could not get sample data for {table}: {e}")));
                None
            }
        }
    }

    pub fn check_fields(columns: &[String]) -> FieldChecklist {
        let presence = |fields: &[&'static str]| -> Vec<FieldPresence> {
            fields
                .iter()
                .map(|&field| FieldPresence {
                    field,
                    present: columns.iter().any(|c| c == field),
                })
                .collect()
        };
        FieldChecklist {
            loan: presence(&LOAN_CHECKLIST),
            accounting: presence(&ACCOUNTING_CHECKLIST),
        }
    }

    /// Inspect one known table.
    pub async fn inspect(&self, table: Table) -> TableReport {
        let full_name = self.namespace.qualify(table);
        let columns = self.table_columns(&full_name).await;
        let sample = self.sample(&full_name, 1).await;

        let observed = columns.as_deref().unwrap_or_default();
        let checklist = Self::check_fields(observed);
        let has = |name: &str| observed.iter().any(|c| c == name);

        match &columns {
            Some(cols) => self.reporter.report(Status::success(format!(
                "{table}: {} columns found",
                cols.len()
            ))),
            None => self
                .reporter
                .report(Status::error(format!("{table}: Could not retrieve columns"))),
        }

        TableReport {
            has_loan_amnt: has("loan_amnt"),
            has_balance: has("balance"),
            column_count: observed.len(),
            full_name,
            checklist,
            sample,
            columns,
        }
    }

    /// Inspect every known table. Each table degrades independently.
    pub async fn validate_all(&self) -> BTreeMap<String, TableReport> {
        let mut reports = BTreeMap::new();
        for table in Table::ALL {
            tracing::info!("Validating {table}");
            reports.insert(table.as_str().to_string(), self.inspect(table).await);
        }
        reports
    }
}
