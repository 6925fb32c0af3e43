//! Dashboard views: named pages of panels, each backed by a predefined query.

pub mod metrics;
pub mod registry;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use loan_analytics::{QueryName, QueryResult};

pub use metrics::{Metric, MetricFormat, MetricSpec};
pub use registry::ViewRegistry;

#[derive(thiserror::Error, Debug)]
pub enum ViewError {
    #[error("Unknown view: {name}. Available views: {}", available.join(", "))]
    UnknownView { name: String, available: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewName {
    Overview,
    Loans,
    Transactions,
}

impl ViewName {
    pub const ALL: [ViewName; 3] = [ViewName::Overview, ViewName::Loans, ViewName::Transactions];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewName::Overview => "overview",
            ViewName::Loans => "loans",
            ViewName::Transactions => "transactions",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewName::Overview => "Loan Portfolio Overview",
            ViewName::Loans => "Detailed Loan Analysis",
            ViewName::Transactions => "Transaction Analysis",
        }
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewName {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewName::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ViewError::UnknownView {
                name: s.to_string(),
                available: ViewName::ALL.iter().map(|v| v.as_str().to_string()).collect(),
            })
    }
}

/// How a panel presents its query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    /// Metric cards read from the first row.
    Metrics(&'static [MetricSpec]),
    /// The first `limit` rows as a table.
    Table { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panel {
    pub title: &'static str,
    pub query: QueryName,
    pub kind: PanelKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelContent {
    Metrics {
        metrics: Vec<Metric>,
    },
    Table {
        result: QueryResult,
        /// Rows before the panel limit was applied.
        total_rows: usize,
    },
    /// The query failed or returned nothing; see the reported statuses.
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPanel {
    pub title: String,
    pub query: String,
    pub content: PanelContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    pub view: ViewName,
    pub title: String,
    pub panels: Vec<RenderedPanel>,
}
