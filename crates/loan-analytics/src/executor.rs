//! Query execution facade.
//!
//! [`QueryExecutor`] is built once at start-up and cloned into every
//! consumer. It resolves symbolic names through the catalog, serves results
//! from the shared cache, and reports every outcome to its status sink
//! instead of returning errors.

use std::sync::Arc;

use crate::cache::{CacheKey, ResultCache};
use crate::catalog::QueryCatalog;
use crate::config::WarehouseConfig;
use crate::connection::{ColumnDescriptor, ConnectionProvider};
use crate::introspect::SchemaInspector;
use crate::report::{Status, StatusSink, TracingSink};
use crate::types::{AnalyticsResult, QueryResult};

#[derive(Clone)]
pub struct QueryExecutor {
    catalog: Arc<QueryCatalog>,
    provider: Arc<ConnectionProvider>,
    cache: ResultCache,
    reporter: Arc<dyn StatusSink>,
}

impl QueryExecutor {
    pub fn new(catalog: QueryCatalog, provider: ConnectionProvider) -> Self {
        Self {
            catalog: Arc::new(catalog),
            provider: Arc::new(provider),
            cache: ResultCache::default(),
            reporter: Arc::new(TracingSink),
        }
    }

    /// Executor for the Databricks warehouse described by `config`.
    pub fn from_config(config: WarehouseConfig) -> Self {
        let catalog = QueryCatalog::new(config.namespace.clone());
        Self::new(catalog, ConnectionProvider::databricks(config))
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    /// A clone sharing cache and connection but reporting to `sink`.
    pub fn with_reporter(&self, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            reporter: sink,
            ..self.clone()
        }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn reporter(&self) -> &dyn StatusSink {
        self.reporter.as_ref()
    }

    fn report(&self, status: Status) {
        self.reporter.report(status);
    }

    /// Run a predefined query by name (or legacy alias).
    pub async fn execute_named(&self, name: &str) -> Option<Arc<QueryResult>> {
        let query = match self.catalog.lookup(name) {
            Ok(query) => query,
            Err(e) => {
                self.report(Status::error(e.to_string()));
                return None;
            }
        };
        let sql = query.sql(self.catalog.namespace());

        // Aliases share their target's entry.
        match self.execute_cached(sql, Some(query.as_str())).await {
            Ok(result) if result.is_empty() => {
                self.report(Status::warning(format!("Query '{name}' returned no results")));
                None
            }
            Ok(result) => {
                self.report(Status::success(format!(
                    "Query '{name}' returned {} rows",
                    result.row_count()
                )));
                Some(result)
            }
            Err(e) => {
                self.report(Status::error(format!("Failed to execute query '{name}': {e}")));
                None
            }
        }
    }

    /// Run caller-supplied SQL as is. Nothing is validated or escaped.
    pub async fn execute_literal(&self, sql: &str) -> Option<Arc<QueryResult>> {
        let sql = sql.trim();
        if sql.is_empty() {
            self.report(Status::warning("Please enter a query to execute"));
            return None;
        }

        match self.execute_cached(sql.to_string(), None).await {
            Ok(result) if result.is_empty() => {
                self.report(Status::warning("Custom query returned no results"));
                None
            }
            Ok(result) => {
                self.report(Status::success(format!(
                    "Query executed successfully. Retrieved {} rows.",
                    result.row_count()
                )));
                Some(result)
            }
            Err(e) => {
                self.report(Status::error(format!("Custom query failed: {e}")));
                None
            }
        }
    }

    async fn execute_cached(
        &self,
        sql: String,
        name: Option<&str>,
    ) -> AnalyticsResult<Arc<QueryResult>> {
        let provider = self.provider.clone();
        let key = CacheKey::new(sql.clone(), name);
        self.cache
            .get_or_try_insert(key, async move { provider.run(&sql).await })
            .await
    }

    /// Drop cached results and the warehouse handle.
    pub async fn clear_all(&self) {
        self.cache.clear();
        self.provider.invalidate().await;
        self.report(Status::info("Cache cleared"));
    }

    /// `(name, description)` of every predefined query.
    pub fn available_queries(&self) -> Vec<(&'static str, &'static str)> {
        self.catalog.list_available()
    }

    /// SQL a name resolves to, without executing it.
    pub fn sql_for(&self, name: &str) -> AnalyticsResult<String> {
        self.catalog.resolve(name)
    }

    pub async fn test_connection(&self) -> bool {
        let ok = self.provider.test_connection().await;
        if ok {
            self.report(Status::success("Database connection established successfully"));
        } else {
            self.report(Status::error("Database connection failed"));
        }
        ok
    }

    pub async fn describe_table(&self, table: &str) -> AnalyticsResult<Vec<ColumnDescriptor>> {
        self.provider.describe_table(table).await
    }

    /// Schema introspector sharing this executor's connection and sink.
    pub fn inspector(&self) -> SchemaInspector {
        SchemaInspector::new(
            self.provider.clone(),
            self.catalog.namespace().clone(),
            self.reporter.clone(),
        )
    }
}
