//! Dashboard view rendering against a scripted warehouse.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use loan_analytics::*;
use loan_analytics_server::render::render_view;
use loan_analytics_server::views::{PanelContent, ViewName, ViewRegistry};

// ─────────────────────── helpers ───────────────────────

/// Answers by recognizing which predefined query is being run.
struct ScriptedService;

fn one_row(pairs: &[(&str, Value)]) -> QueryResult {
    QueryResult::new(
        pairs.iter().map(|(c, _)| Column::new(*c)).collect(),
        vec![pairs.iter().map(|(_, v)| v.clone()).collect()],
    )
}

#[async_trait]
impl SqlService for ScriptedService {
    async fn execute(&self, sql: &str) -> AnalyticsResult<QueryResult> {
        if sql.contains("total_loans") {
            return Ok(one_row(&[
                ("total_loans", json!(1234567)),
                ("avg_loan_amount", json!(15234.567)),
                ("total_loan_amount", json!(152345678.0)),
                ("unique_grades", json!(7)),
            ]));
        }
        if sql.contains("total_transactions") {
            return Ok(one_row(&[
                ("total_transactions", json!(5000)),
                ("unique_treatments", json!(12)),
                ("avg_balance", Value::Null),
                ("total_balance", json!(2500000.0)),
            ]));
        }
        if sql.contains("addr_state") {
            return Err(AnalyticsError::Execution("warehouse unavailable".into()));
        }
        let rows = (0..30).map(|i| vec![json!(format!("k{i}")), json!(i)]).collect();
        Ok(QueryResult::new(vec![Column::new("key"), Column::new("n")], rows))
    }
}

struct ScriptedConnector;

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _config: &WarehouseConfig) -> AnalyticsResult<Arc<dyn SqlService>> {
        Ok(Arc::new(ScriptedService))
    }
}

fn executor(sink: &CollectingSink) -> QueryExecutor {
    let config = WarehouseConfig {
        host: Some("https://warehouse.test".into()),
        warehouse_id: Some("wh-1".into()),
        ..WarehouseConfig::default()
    };
    let provider = ConnectionProvider::new(config, Box::new(ScriptedConnector));
    QueryExecutor::new(QueryCatalog::default(), provider).with_reporter(Arc::new(sink.clone()))
}

// ─────────────────────── overview ───────────────────────

#[tokio::test]
async fn test_overview_metrics_are_formatted() {
    let sink = CollectingSink::new();
    let view = ViewRegistry::render(ViewName::Overview, &executor(&sink)).await;

    assert_eq!(view.panels.len(), 2);
    let PanelContent::Metrics { metrics } = &view.panels[0].content else {
        panic!("loan panel should show metrics");
    };
    let values: Vec<(&str, &str)> = metrics
        .iter()
        .map(|m| (m.label.as_str(), m.value.as_str()))
        .collect();
    assert_eq!(
        values,
        vec![
            ("Total Loans", "1,234,567"),
            ("Avg Loan Amount", "$15,234.57"),
            ("Total Loan Amount", "$152.3M"),
            ("Unique Grades", "7"),
        ]
    );

    let PanelContent::Metrics { metrics } = &view.panels[1].content else {
        panic!("transaction panel should show metrics");
    };
    assert_eq!(metrics[2].value, "N/A");
    assert_eq!(metrics[3].value, "$2.5M");
}

// ─────────────────────── tables ───────────────────────

#[tokio::test]
async fn test_table_panels_apply_limits() {
    let sink = CollectingSink::new();
    let view = ViewRegistry::render(ViewName::Loans, &executor(&sink)).await;

    let purpose = view
        .panels
        .iter()
        .find(|p| p.query == "purpose_analysis")
        .unwrap();
    match &purpose.content {
        PanelContent::Table { result, total_rows } => {
            assert_eq!(result.row_count(), 10);
            assert_eq!(*total_rows, 30);
        }
        other => panic!("unexpected content {other:?}"),
    }
}

#[tokio::test]
async fn test_failing_panel_does_not_break_view() {
    let sink = CollectingSink::new();
    let view = ViewRegistry::render(ViewName::Loans, &executor(&sink)).await;

    let state = view
        .panels
        .iter()
        .find(|p| p.query == "state_distribution")
        .unwrap();
    assert_eq!(state.content, PanelContent::NoData);
    assert!(sink.has_level(StatusLevel::Error));

    let others = view.panels.iter().filter(|p| p.content != PanelContent::NoData).count();
    assert_eq!(others, view.panels.len() - 1);

    let text = render_view(&view);
    assert!(text.contains("No data available"));
    assert!(text.contains("Top 10 Loan Purposes"));
}

#[tokio::test]
async fn test_unknown_view_name() {
    let sink = CollectingSink::new();
    let err = ViewRegistry::render_by_name("debug", &executor(&sink))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Available views"));
}

#[tokio::test]
async fn test_view_serializes_with_panel_kind() {
    let sink = CollectingSink::new();
    let view = ViewRegistry::render(ViewName::Transactions, &executor(&sink)).await;
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["view"], "transactions");
    assert_eq!(json["panels"][0]["content"]["kind"], "table");
    assert_eq!(json["panels"][0]["query"], "accounting_treatment_analysis");
}
