//! Front-end configuration: environment, CLI overrides, and local paths.

use std::path::PathBuf;

use loan_analytics::{QueryExecutor, TableNamespace, WarehouseConfig};

/// Bearer token required by the HTTP surface.
pub const ENV_HTTP_TOKEN: &str = "LOAN_ANALYTICS_TOKEN";

/// Warehouse configuration from the environment, with optional namespace
/// overrides from the command line.
pub fn resolve_warehouse_config(catalog: Option<&str>, schema: Option<&str>) -> WarehouseConfig {
    let mut config = WarehouseConfig::from_env();
    if catalog.is_some() || schema.is_some() {
        config.namespace = TableNamespace::new(
            catalog.unwrap_or(&config.namespace.catalog),
            schema.unwrap_or(&config.namespace.schema),
        );
    }
    config
}

/// The shared executor every command runs through.
pub fn build_executor(catalog: Option<&str>, schema: Option<&str>) -> QueryExecutor {
    let config = resolve_warehouse_config(catalog, schema);
    tracing::debug!(
        "Warehouse {} on {} ({})",
        config.warehouse_id.as_deref().unwrap_or("<unset>"),
        config.host.as_deref().unwrap_or("<unset>"),
        config.namespace
    );
    QueryExecutor::from_config(config)
}

/// CLI flag, else `LOAN_ANALYTICS_TOKEN`.
pub fn resolve_http_token(explicit: Option<String>) -> Option<String> {
    explicit
        .or_else(|| std::env::var(ENV_HTTP_TOKEN).ok())
        .filter(|t| !t.trim().is_empty())
}

pub fn history_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".loan_analytics_history")
}
