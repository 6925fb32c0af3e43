//! HTTP JSON transport with bearer auth and an unauthenticated /health.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use loan_analytics::{CollectingSink, QueryExecutor, QueryResult, Status, StatusLevel};

use super::TransportError;
use crate::views::{ViewName, ViewRegistry};

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    pub token: Option<String>,
    pub executor: QueryExecutor,
}

pub struct HttpTransport {
    state: Arc<ServerState>,
}

impl HttpTransport {
    pub fn new(executor: QueryExecutor, token: Option<String>) -> Self {
        Self {
            state: Arc::new(ServerState { token, executor }),
        }
    }

    pub fn router(&self) -> Router {
        let state = self.state.clone();

        Router::new()
            .route("/queries", get(handle_list_queries))
            .route("/queries/:name", get(handle_run_query))
            .route("/queries/:name/sql", get(handle_query_sql))
            .route("/sql", post(handle_sql))
            .route("/views", get(handle_list_views))
            .route("/views/:name", get(handle_view))
            .route("/schema", get(handle_schema))
            .route("/cache/clear", post(handle_clear_cache))
            .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
            .route("/health", get(handle_health))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> Result<(), TransportError> {
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| TransportError::Serve(e.to_string()))?;

        Ok(())
    }
}

/// Checks the bearer token when one is configured.
async fn auth_layer(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: middleware::Next,
) -> Response {
    if let Some(expected) = &state.token {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                AxumJson(json!({"error": "Unauthorized"})),
            )
                .into_response();
        }
    }

    next.run(request).await
}

/// Executor that records what it reports for the current request.
fn request_scope(state: &ServerState) -> (QueryExecutor, CollectingSink) {
    let sink = CollectingSink::new();
    (state.executor.with_reporter(Arc::new(sink.clone())), sink)
}

fn with_statuses(mut body: Value, statuses: Vec<Status>) -> Value {
    body["statuses"] = json!(statuses);
    body
}

fn result_body(result: &QueryResult) -> Value {
    json!({
        "metadata": result.metadata(),
        "columns": result.columns,
        "data": result.records(),
    })
}

/// 200 with data, 200 with `data: null` for an empty result, 502 when the
/// warehouse reported an error.
fn result_response(result: Option<Arc<QueryResult>>, sink: &CollectingSink) -> Response {
    let statuses = sink.drain();
    match result {
        Some(result) => AxumJson(with_statuses(result_body(&result), statuses)).into_response(),
        None => {
            let failed = statuses.iter().any(|s| s.level == StatusLevel::Error);
            let code = if failed { StatusCode::BAD_GATEWAY } else { StatusCode::OK };
            (code, AxumJson(with_statuses(json!({"data": null}), statuses))).into_response()
        }
    }
}

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, AxumJson(json!({"error": message}))).into_response()
}

async fn handle_health(State(state): State<Arc<ServerState>>) -> AxumJson<Value> {
    AxumJson(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connected": state.executor.provider().is_connected(),
    }))
}

async fn handle_list_queries(State(state): State<Arc<ServerState>>) -> AxumJson<Value> {
    let catalog = state.executor.catalog();
    let queries: Vec<Value> = loan_analytics::QueryName::ALL
        .iter()
        .map(|q| {
            json!({
                "name": q.as_str(),
                "description": q.description(),
                "domain": q.domain(),
            })
        })
        .collect();
    let aliases: HashMap<&str, &str> = loan_analytics::LEGACY_ALIASES
        .iter()
        .map(|(alias, target)| (*alias, target.as_str()))
        .collect();

    AxumJson(json!({
        "namespace": catalog.namespace().to_string(),
        "queries": queries,
        "aliases": aliases,
    }))
}

async fn handle_run_query(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    if let Err(e) = state.executor.catalog().lookup(&name) {
        return not_found(e.to_string());
    }
    let (executor, sink) = request_scope(&state);
    let result = executor.execute_named(&name).await;
    result_response(result, &sink)
}

async fn handle_query_sql(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.executor.sql_for(&name) {
        Ok(sql) => AxumJson(json!({"query": name, "sql": sql.trim()})).into_response(),
        Err(e) => not_found(e.to_string()),
    }
}

#[derive(Deserialize)]
struct SqlRequest {
    sql: String,
}

#[derive(Deserialize)]
struct FormatParam {
    format: Option<String>,
}

async fn handle_sql(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<FormatParam>,
    AxumJson(body): AxumJson<SqlRequest>,
) -> Response {
    let (executor, sink) = request_scope(&state);
    if body.sql.trim().is_empty() {
        // Only reports the warning; blank input never reaches the warehouse.
        executor.execute_literal(&body.sql).await;
        return (
            StatusCode::BAD_REQUEST,
            AxumJson(with_statuses(json!({"error": "Empty query"}), sink.drain())),
        )
            .into_response();
    }

    let result = executor.execute_literal(&body.sql).await;

    let wants_csv = params.format.as_deref() == Some("csv");
    match (wants_csv, result) {
        (true, Some(result)) => match loan_analytics::to_csv(&result) {
            Ok(csv) => (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (header::CONTENT_DISPOSITION, "attachment; filename=\"query_results.csv\""),
                ],
                csv,
            )
                .into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                AxumJson(with_statuses(json!({"error": e.to_string()}), sink.drain())),
            )
                .into_response(),
        },
        (_, result) => result_response(result, &sink),
    }
}

async fn handle_list_views() -> AxumJson<Value> {
    let views: Vec<Value> = ViewRegistry::list_views()
        .into_iter()
        .map(|(name, title)| json!({"name": name, "title": title}))
        .collect();
    AxumJson(json!({"views": views}))
}

async fn handle_view(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    let view: ViewName = match name.parse() {
        Ok(v) => v,
        Err(e) => return not_found(format!("{e}")),
    };
    let (executor, sink) = request_scope(&state);
    let rendered = ViewRegistry::render(view, &executor).await;
    let body = match serde_json::to_value(&rendered) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                AxumJson(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    };
    AxumJson(with_statuses(body, sink.drain())).into_response()
}

async fn handle_schema(State(state): State<Arc<ServerState>>) -> AxumJson<Value> {
    let (executor, sink) = request_scope(&state);
    let reports = executor.inspector().validate_all().await;
    AxumJson(with_statuses(json!({"tables": reports}), sink.drain()))
}

async fn handle_clear_cache(State(state): State<Arc<ServerState>>) -> AxumJson<Value> {
    let (executor, sink) = request_scope(&state);
    executor.clear_all().await;
    AxumJson(with_statuses(json!({"cleared": true}), sink.drain()))
}
