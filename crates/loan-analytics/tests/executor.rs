//! Execution facade tests against an in-process warehouse double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use loan_analytics::*;

// ─────────────────────── helpers ───────────────────────

/// What the fake warehouse answers with.
#[derive(Clone)]
enum Reply {
    Rows(QueryResult),
    Fail(String),
}

struct FakeService {
    reply: Reply,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SqlService for FakeService {
    async fn execute(&self, sql: &str) -> AnalyticsResult<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(sql.to_string());
        match &self.reply {
            Reply::Rows(result) => Ok(result.clone()),
            Reply::Fail(msg) => Err(AnalyticsError::Execution(msg.clone())),
        }
    }
}

struct FakeConnector {
    reply: Reply,
    connects: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
    refuse: bool,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _config: &WarehouseConfig) -> AnalyticsResult<Arc<dyn SqlService>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(AnalyticsError::Connection("handshake refused".into()));
        }
        Ok(Arc::new(FakeService {
            reply: self.reply.clone(),
            calls: self.calls.clone(),
            seen: self.seen.clone(),
        }))
    }
}

struct Harness {
    executor: QueryExecutor,
    sink: CollectingSink,
    connects: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

fn configured() -> WarehouseConfig {
    WarehouseConfig {
        host: Some("https://warehouse.test".into()),
        warehouse_id: Some("wh-1".into()),
        ..WarehouseConfig::default()
    }
}

fn harness_with(config: WarehouseConfig, reply: Reply, refuse: bool) -> Harness {
    let connects = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let connector = FakeConnector {
        reply,
        connects: connects.clone(),
        calls: calls.clone(),
        seen: seen.clone(),
        refuse,
    };
    let provider = ConnectionProvider::new(config, Box::new(connector));
    let sink = CollectingSink::new();
    let executor =
        QueryExecutor::new(QueryCatalog::default(), provider).with_reporter(Arc::new(sink.clone()));
    Harness {
        executor,
        sink,
        connects,
        calls,
        seen,
    }
}

fn harness(reply: Reply) -> Harness {
    harness_with(configured(), reply, false)
}

fn table(rows: usize, cols: usize) -> QueryResult {
    let columns = (0..cols).map(|c| Column::new(format!("c{c}"))).collect();
    let data = (0..rows)
        .map(|r| (0..cols).map(|c| json!(r * cols + c)).collect())
        .collect();
    QueryResult::new(columns, data)
}

fn levels(sink: &CollectingSink) -> Vec<StatusLevel> {
    sink.statuses().iter().map(|s| s.level).collect()
}

// ─────────────────────── named queries ───────────────────────

#[tokio::test]
async fn test_named_query_metadata_matches_rows() {
    let h = harness(Reply::Rows(table(5, 4)));

    let result = h.executor.execute_named("loan_summary").await.unwrap();
    let meta = result.metadata();
    assert_eq!(meta.row_count, 5);
    assert_eq!(meta.column_count, 4);
    assert_eq!(meta.columns, vec!["c0", "c1", "c2", "c3"]);
    assert_eq!(levels(&h.sink), vec![StatusLevel::Success]);

    let sql = h.seen.lock().unwrap()[0].clone();
    assert!(sql.contains("efeld_cuj.loan_io.historical_loans"));
}

#[tokio::test]
async fn test_unknown_name_executes_nothing() {
    let h = harness(Reply::Rows(table(1, 1)));

    assert!(h.executor.execute_named("does_not_exist").await.is_none());
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.connects.load(Ordering::SeqCst), 0);

    let statuses = h.sink.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].level, StatusLevel::Error);
    assert!(statuses[0].message.contains("does_not_exist"));
    assert!(statuses[0].message.contains("loan_summary"));
}

#[tokio::test]
async fn test_empty_result_is_warning_not_error() {
    let h = harness(Reply::Rows(table(0, 3)));

    assert!(h.executor.execute_named("grade_analysis").await.is_none());
    assert_eq!(levels(&h.sink), vec![StatusLevel::Warning]);
}

#[tokio::test]
async fn test_execution_fault_is_reported() {
    let h = harness(Reply::Fail("TABLE_OR_VIEW_NOT_FOUND".into()));

    assert!(h.executor.execute_named("transaction_summary").await.is_none());
    let statuses = h.sink.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].level, StatusLevel::Error);
    assert!(statuses[0].message.contains("TABLE_OR_VIEW_NOT_FOUND"));
}

#[tokio::test]
async fn test_legacy_alias_runs_target_query() {
    let h = harness(Reply::Rows(table(2, 2)));

    assert!(h.executor.execute_named("accounting").await.is_some());
    let sql = h.seen.lock().unwrap()[0].clone();
    assert!(sql.contains("JOIN"));
    assert!(sql.contains("ref_accounting"));
}

// ─────────────────────── caching ───────────────────────

#[tokio::test]
async fn test_repeat_is_served_from_cache() {
    let h = harness(Reply::Rows(table(3, 2)));

    for _ in 0..3 {
        assert!(h.executor.execute_named("state_distribution").await.is_some());
    }
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_alias_shares_cache_entry_with_target() {
    let h = harness(Reply::Rows(table(2, 2)));

    h.executor.execute_named("overview").await.unwrap();
    h.executor.execute_named("loan_summary").await.unwrap();
    h.executor.execute_named(" loan_summary ").await.unwrap();
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_custom_cache_ttl_expires_results() {
    let h = harness(Reply::Rows(table(1, 1)));
    let executor = h
        .executor
        .clone()
        .with_cache(ResultCache::new(std::time::Duration::from_millis(50)));
    assert_eq!(executor.cache().ttl(), std::time::Duration::from_millis(50));

    executor.execute_named("grade_analysis").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    executor.execute_named("grade_analysis").await.unwrap();
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_clear_then_execute_reaches_service() {
    let h = harness(Reply::Rows(table(3, 2)));

    h.executor.execute_named("risk_analysis").await.unwrap();
    h.executor.clear_all().await;
    h.executor.execute_named("risk_analysis").await.unwrap();

    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_clones_share_cache() {
    let h = harness(Reply::Rows(table(1, 1)));
    let other = h.executor.with_reporter(Arc::new(TracingSink));

    h.executor.execute_named("loan_summary").await.unwrap();
    other.execute_named("loan_summary").await.unwrap();
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_first_requests_coalesce() {
    let h = harness(Reply::Rows(table(2, 2)));

    let a = h.executor.clone();
    let b = h.executor.clone();
    let (ra, rb) = tokio::join!(a.execute_named("purpose_analysis"), b.execute_named("purpose_analysis"));
    assert!(ra.is_some() && rb.is_some());
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

// ─────────────────────── literal queries ───────────────────────

#[tokio::test]
async fn test_literal_query_runs_unmodified() {
    let h = harness(Reply::Rows(table(1, 1)));

    let sql = "SELECT COUNT(*) FROM efeld_cuj.loan_io.raw_transactions";
    assert!(h.executor.execute_literal(sql).await.is_some());
    assert_eq!(h.seen.lock().unwrap()[0], sql);
}

#[tokio::test]
async fn test_blank_literal_is_not_executed() {
    let h = harness(Reply::Rows(table(1, 1)));

    assert!(h.executor.execute_literal("   \n").await.is_none());
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert_eq!(levels(&h.sink), vec![StatusLevel::Warning]);
}

// ─────────────────────── connection ───────────────────────

#[tokio::test]
async fn test_missing_warehouse_id_is_configuration_error() {
    let config = WarehouseConfig {
        host: Some("https://warehouse.test".into()),
        ..WarehouseConfig::default()
    };
    let h = harness_with(config, Reply::Rows(table(1, 1)), false);

    let err = h.executor.provider().get_connection().await.err().unwrap();
    assert!(matches!(err, AnalyticsError::Configuration(_)));
    assert_eq!(h.connects.load(Ordering::SeqCst), 0);

    assert!(h.executor.execute_named("loan_summary").await.is_none());
    assert!(h.sink.has_level(StatusLevel::Error));
}

#[tokio::test]
async fn test_failed_handshake_is_not_cached() {
    let h = harness_with(configured(), Reply::Rows(table(1, 1)), true);

    for _ in 0..2 {
        let err = h.executor.provider().get_connection().await.err().unwrap();
        assert!(matches!(err, AnalyticsError::Connection(_)));
    }
    assert_eq!(h.connects.load(Ordering::SeqCst), 2);
    assert!(!h.executor.provider().is_connected());
}

#[tokio::test]
async fn test_connection_is_reused_within_ttl() {
    let h = harness(Reply::Rows(table(1, 1)));

    h.executor.provider().get_connection().await.unwrap();
    h.executor.provider().get_connection().await.unwrap();
    assert_eq!(h.connects.load(Ordering::SeqCst), 1);
    assert!(h.executor.provider().is_connected());
}

/// Holds the handshake open until released.
struct StalledConnector {
    release: Arc<tokio::sync::Notify>,
}

#[async_trait]
impl Connector for StalledConnector {
    async fn connect(&self, _config: &WarehouseConfig) -> AnalyticsResult<Arc<dyn SqlService>> {
        self.release.notified().await;
        Ok(Arc::new(FakeService {
            reply: Reply::Rows(table(1, 1)),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }))
    }
}

#[tokio::test]
async fn test_connected_state_does_not_wait_for_handshake() {
    let release = Arc::new(tokio::sync::Notify::new());
    let provider = Arc::new(ConnectionProvider::new(
        configured(),
        Box::new(StalledConnector {
            release: release.clone(),
        }),
    ));

    let pending = tokio::spawn({
        let provider = provider.clone();
        async move { provider.get_connection().await.is_ok() }
    });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert!(!provider.is_connected());
    release.notify_one();
    assert!(pending.await.unwrap());
    assert!(provider.is_connected());
}

#[tokio::test]
async fn test_expired_connection_reconnects() {
    let connects = Arc::new(AtomicUsize::new(0));
    let connector = FakeConnector {
        reply: Reply::Rows(table(1, 1)),
        connects: connects.clone(),
        calls: Arc::new(AtomicUsize::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
        refuse: false,
    };
    let provider = ConnectionProvider::new(configured(), Box::new(connector))
        .with_ttl(std::time::Duration::ZERO);

    provider.get_connection().await.unwrap();
    provider.get_connection().await.unwrap();
    assert_eq!(connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_sentinel_execute_reports_instead_of_failing() {
    let h = harness(Reply::Fail("boom".into()));
    let sink = CollectingSink::new();

    assert!(h.executor.provider().execute("SELECT 1", &sink).await.is_none());
    assert!(sink.has_level(StatusLevel::Error));
}

#[tokio::test]
async fn test_connection_probe() {
    let ok = harness(Reply::Rows(QueryResult::new(
        vec![Column::new("test")],
        vec![vec![json!(1)]],
    )));
    assert!(ok.executor.test_connection().await);
    assert_eq!(ok.seen.lock().unwrap()[0], "SELECT 1 as test");

    let bad = harness(Reply::Fail("down".into()));
    assert!(!bad.executor.test_connection().await);
    assert!(bad.sink.has_level(StatusLevel::Error));
}

// ─────────────────────── schema introspection ───────────────────────

fn describe_reply(names: &[&str]) -> Reply {
    Reply::Rows(QueryResult::new(
        vec![Column::new("col_name"), Column::new("data_type"), Column::new("comment")],
        names
            .iter()
            .map(|n| vec![json!(n), json!("string"), Value::Null])
            .collect(),
    ))
}

#[tokio::test]
async fn test_describe_table_lists_columns() {
    let h = harness(describe_reply(&["id", "balance"]));

    let cols = h
        .executor
        .describe_table("efeld_cuj.loan_io.raw_transactions")
        .await
        .unwrap();
    let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "balance"]);
    assert_eq!(
        h.seen.lock().unwrap()[0],
        "DESCRIBE TABLE efeld_cuj.loan_io.raw_transactions"
    );

    let inspector = h.executor.inspector();
    let table = "efeld_cuj.loan_io.raw_transactions";
    assert!(inspector.validate_column_exists(table, "balance").await);
    assert!(!inspector.validate_column_exists(table, "loan_amnt").await);
}

#[tokio::test]
async fn test_validate_all_covers_every_table() {
    let h = harness(describe_reply(&["id", "balance", "status"]));

    let reports = h.executor.inspector().validate_all().await;
    assert_eq!(
        reports.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["historical_loans", "raw_transactions", "ref_accounting"]
    );

    let tx = &reports["raw_transactions"];
    assert_eq!(tx.full_name, "efeld_cuj.loan_io.raw_transactions");
    assert_eq!(tx.column_count, 3);
    assert!(tx.has_balance);
    assert!(!tx.has_loan_amnt);
    assert!(tx.sample.is_some());
}

#[tokio::test]
async fn test_validate_all_degrades_per_table() {
    let h = harness(Reply::Fail("permission denied".into()));

    let reports = h.executor.inspector().validate_all().await;
    assert_eq!(reports.len(), 3);
    for report in reports.values() {
        assert!(report.columns.is_none());
        assert_eq!(report.column_count, 0);
        assert!(report.sample.is_none());
        assert!(!report.has_balance);
    }
    assert!(h.sink.has_level(StatusLevel::Warning));
}
