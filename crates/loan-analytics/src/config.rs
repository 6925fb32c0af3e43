//! Warehouse configuration resolved from the process environment.

use std::time::Duration;

use crate::schema::{TableNamespace, DEFAULT_CATALOG, DEFAULT_SCHEMA};
use crate::types::{AnalyticsError, AnalyticsResult};

pub const ENV_HOST: &str = "DATABRICKS_HOST";
pub const ENV_WAREHOUSE_ID: &str = "DATABRICKS_WAREHOUSE_ID";
pub const ENV_TOKEN: &str = "DATABRICKS_TOKEN";
pub const ENV_CATALOG: &str = "LOAN_ANALYTICS_CATALOG";
pub const ENV_SCHEMA: &str = "LOAN_ANALYTICS_SCHEMA";

pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// How long a query result stays cached.
pub const DEFAULT_RESULT_TTL_SECS: u64 = 300;
/// How long a warehouse handle is reused before reconnecting.
pub const DEFAULT_CONNECTION_TTL_SECS: u64 = 600;

/// Everything needed to reach the SQL warehouse.
///
/// The warehouse id is optional here: its absence is reported when a
/// connection is first requested, not at construction.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Workspace base URL, always with a scheme and without a trailing slash.
    pub host: Option<String>,
    pub warehouse_id: Option<String>,
    pub token: Option<String>,
    pub namespace: TableNamespace,
    /// Server-side wait before a statement call returns `PENDING`.
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Upper bound on polling a running statement.
    pub query_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: None,
            warehouse_id: None,
            token: None,
            namespace: TableNamespace::default(),
            wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl WarehouseConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let namespace = TableNamespace::new(
            get(ENV_CATALOG).unwrap_or_else(|| DEFAULT_CATALOG.to_string()),
            get(ENV_SCHEMA).unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        );

        Self {
            host: get(ENV_HOST).map(|h| normalize_host(&h)),
            warehouse_id: get(ENV_WAREHOUSE_ID),
            token: get(ENV_TOKEN),
            namespace,
            ..Self::default()
        }
    }

    /// Warehouse id, or a configuration error naming the variable.
    pub fn require_warehouse_id(&self) -> AnalyticsResult<&str> {
        self.warehouse_id.as_deref().ok_or_else(|| {
            AnalyticsError::Configuration(format!("{ENV_WAREHOUSE_ID} environment variable not set"))
        })
    }

    pub fn require_host(&self) -> AnalyticsResult<&str> {
        self.host.as_deref().ok_or_else(|| {
            AnalyticsError::Configuration(format!("{ENV_HOST} environment variable not set"))
        })
    }
}

/// Add `https://` when no scheme is given and drop trailing slashes.
pub fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
