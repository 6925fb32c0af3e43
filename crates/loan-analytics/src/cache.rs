//! Time-boxed memoization of query results, keyed by statement text.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::DEFAULT_RESULT_TTL_SECS;
use crate::types::{AnalyticsError, AnalyticsResult, QueryResult};

const MAX_ENTRIES: u64 = 1_000;

/// Exact statement text plus the symbolic name it came from, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sql: String,
    pub name: Option<String>,
}

impl CacheKey {
    pub fn new(sql: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            sql: sql.into(),
            name: name.map(str::to_string),
        }
    }
}

/// Shared result cache. Clones share the same entries.
///
/// Concurrent loads of one key are coalesced into a single execution and
/// failed loads are never stored.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<CacheKey, Arc<QueryResult>>,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_RESULT_TTL_SECS))
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ttl)
            .build();
        Self { inner, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<QueryResult>> {
        self.inner.get(key).await
    }

    /// Cached value for `key`, or the result of `load`, stored on success.
    pub async fn get_or_try_insert<F>(&self, key: CacheKey, load: F) -> AnalyticsResult<Arc<QueryResult>>
    where
        F: Future<Output = AnalyticsResult<QueryResult>>,
    {
        if let Some(hit) = self.inner.get(&key).await {
            tracing::debug!("Cache hit for {}", key.name.as_deref().unwrap_or("literal query"));
            return Ok(hit);
        }

        self.inner
            .try_get_with(key, async move { load.await.map(Arc::new) })
            .await
            .map_err(unshare)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
        tracing::info!("Result cache cleared");
    }

    /// Approximate number of live entries.
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recover an owned error from the one moka shares between coalesced callers.
fn unshare(err: Arc<AnalyticsError>) -> AnalyticsError {
    match Arc::try_unwrap(err) {
        Ok(owned) => owned,
        Err(shared) => match shared.as_ref() {
            AnalyticsError::Configuration(m) => AnalyticsError::Configuration(m.clone()),
            AnalyticsError::Connection(m) => AnalyticsError::Connection(m.clone()),
            AnalyticsError::UnknownQueryName { name, available } => AnalyticsError::UnknownQueryName {
                name: name.clone(),
                available: available.clone(),
            },
            AnalyticsError::Export(m) => AnalyticsError::Export(m.clone()),
            AnalyticsError::Execution(m) => AnalyticsError::Execution(m.clone()),
            other => AnalyticsError::Execution(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn one_row() -> QueryResult {
        QueryResult::new(vec![Column::new("n")], vec![vec![json!(1)]])
    }

    #[tokio::test]
    async fn test_second_load_is_served_from_cache() {
        let cache = ResultCache::default();
        let calls = AtomicUsize::new(0);
        let key = CacheKey::new("SELECT 1", Some("one"));

        for _ in 0..3 {
            let result = cache
                .get_or_try_insert(key.clone(), async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(one_row())
                })
                .await
                .unwrap();
            assert_eq!(result.row_count(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ResultCache::default();
        let key = CacheKey::new("SELECT broken", None);

        let err = cache
            .get_or_try_insert(key.clone(), async {
                Err(AnalyticsError::Execution("boom".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Execution(_)));

        let ok = cache
            .get_or_try_insert(key, async { Ok(one_row()) })
            .await
            .unwrap();
        assert_eq!(ok.row_count(), 1);
    }

    #[tokio::test]
    async fn test_name_is_part_of_key() {
        let cache = ResultCache::default();
        cache
            .get_or_try_insert(CacheKey::new("SELECT 1", Some("a")), async { Ok(one_row()) })
            .await
            .unwrap();

        assert!(cache.get(&CacheKey::new("SELECT 1", Some("a"))).await.is_some());
        assert!(cache.get(&CacheKey::new("SELECT 1", None)).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_forces_reload() {
        let cache = ResultCache::default();
        let key = CacheKey::new("SELECT 1", None);
        cache
            .get_or_try_insert(key.clone(), async { Ok(one_row()) })
            .await
            .unwrap();

        cache.clear();
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = ResultCache::new(Duration::from_millis(50));
        let key = CacheKey::new("SELECT 1", None);
        cache
            .get_or_try_insert(key.clone(), async { Ok(one_row()) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(&key).await.is_none());
    }
}
