//! View registration and rendering.

use loan_analytics::{QueryExecutor, QueryName};

use super::metrics::{self, MetricFormat as F, MetricSpec};
use super::{Panel, PanelContent, PanelKind, RenderedPanel, RenderedView, ViewError, ViewName};

const LOAN_METRICS: &[MetricSpec] = &[
    MetricSpec::new("Total Loans", "total_loans", F::Count),
    MetricSpec::new("Avg Loan Amount", "avg_loan_amount", F::Currency),
    MetricSpec::new("Total Loan Amount", "total_loan_amount", F::Millions),
    MetricSpec::new("Unique Grades", "unique_grades", F::Plain),
];

const TRANSACTION_METRICS: &[MetricSpec] = &[
    MetricSpec::new("Total Transactions", "total_transactions", F::Count),
    MetricSpec::new("Unique Treatments", "unique_treatments", F::Count),
    MetricSpec::new("Avg Balance", "avg_balance", F::Currency),
    MetricSpec::new("Total Balance", "total_balance", F::Millions),
];

const OVERVIEW: &[Panel] = &[
    Panel {
        title: "Loan Portfolio",
        query: QueryName::LoanSummary,
        kind: PanelKind::Metrics(LOAN_METRICS),
    },
    Panel {
        title: "Transaction Summary",
        query: QueryName::TransactionSummary,
        kind: PanelKind::Metrics(TRANSACTION_METRICS),
    },
];

const LOANS: &[Panel] = &[
    Panel {
        title: "Loan Status Distribution",
        query: QueryName::LoanStatusDistribution,
        kind: PanelKind::Table { limit: 20 },
    },
    Panel {
        title: "Grade Analysis",
        query: QueryName::GradeAnalysis,
        kind: PanelKind::Table { limit: 20 },
    },
    Panel {
        title: "Top 10 Loan Purposes",
        query: QueryName::PurposeAnalysis,
        kind: PanelKind::Table { limit: 10 },
    },
    Panel {
        title: "Top 15 States by Loan Count",
        query: QueryName::StateDistribution,
        kind: PanelKind::Table { limit: 15 },
    },
];

const TRANSACTIONS: &[Panel] = &[
    Panel {
        title: "Accounting Treatment Analysis",
        query: QueryName::AccountingTreatmentAnalysis,
        kind: PanelKind::Table { limit: 20 },
    },
    Panel {
        title: "Monthly Loan Trends",
        query: QueryName::MonthlyLoanTrend,
        kind: PanelKind::Table { limit: 50 },
    },
];

pub struct ViewRegistry;

impl ViewRegistry {
    /// `(name, title)` of every view.
    pub fn list_views() -> Vec<(&'static str, &'static str)> {
        ViewName::ALL.iter().map(|v| (v.as_str(), v.title())).collect()
    }

    pub fn panels(view: ViewName) -> &'static [Panel] {
        match view {
            ViewName::Overview => OVERVIEW,
            ViewName::Loans => LOANS,
            ViewName::Transactions => TRANSACTIONS,
        }
    }

    /// Run every panel's query and shape the results.
    ///
    /// A failing panel becomes [`PanelContent::NoData`]; the others still render.
    pub async fn render(view: ViewName, executor: &QueryExecutor) -> RenderedView {
        let mut panels = Vec::new();
        for panel in Self::panels(view) {
            let content = match executor.execute_named(panel.query.as_str()).await {
                None => PanelContent::NoData,
                Some(result) => match panel.kind {
                    PanelKind::Metrics(specs) => PanelContent::Metrics {
                        metrics: metrics::metrics(&result, specs),
                    },
                    PanelKind::Table { limit } => PanelContent::Table {
                        result: result.head(limit),
                        total_rows: result.row_count(),
                    },
                },
            };
            panels.push(RenderedPanel {
                title: panel.title.to_string(),
                query: panel.query.as_str().to_string(),
                content,
            });
        }

        RenderedView {
            view,
            title: view.title().to_string(),
            panels,
        }
    }

    pub async fn render_by_name(name: &str, executor: &QueryExecutor) -> Result<RenderedView, ViewError> {
        let view: ViewName = name.parse()?;
        Ok(Self::render(view, executor).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_view_has_panels() {
        for view in ViewName::ALL {
            assert!(!ViewRegistry::panels(view).is_empty(), "{view} has no panels");
        }
    }

    #[test]
    fn test_overview_reads_summary_queries() {
        let queries: Vec<_> = ViewRegistry::panels(ViewName::Overview)
            .iter()
            .map(|p| p.query)
            .collect();
        assert_eq!(queries, vec![QueryName::LoanSummary, QueryName::TransactionSummary]);
    }

    #[test]
    fn test_unknown_view_lists_names() {
        let err = "debug".parse::<ViewName>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("debug"));
        assert!(msg.contains("overview, loans, transactions"));
    }
}
