// Keyed, time-boxed memoisation of query results.
//
// Keys are built by callers; the cache is shape-agnostic. An entry is valid
// while `now - stored_at < ttl`. Expired or absent entries are plain misses and
// are only evicted when read, overwritten, or invalidated.

use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::Timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: Timestamp,
}

#[derive(Debug)]
pub struct TtlCache<T: Clone + Send + Sync> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl<T: Clone + Send + Sync> TtlCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            clock,
        }
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        {
            let guard = self.entries.read().await;
            match guard.get(key) {
                None => return None,
                Some(entry) if now - entry.stored_at < self.ttl_ms => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }
        let mut guard = self.entries.write().await;
        if guard
            .get(key)
            .is_some_and(|entry| now - entry.stored_at >= self.ttl_ms)
        {
            guard.remove(key);
            tracing::debug!(key, "cache entry expired");
        }
        None
    }

    pub async fn set(&self, key: impl Into<String>, value: T) {
        let stored_at = self.clock.now_ms();
        self.entries
            .write()
            .await
            .insert(key.into(), CacheEntry { value, stored_at });
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod read_cache_tests {
    use super::*;
    use crate::shared::core::clock::ManualClock;
    use rstest::{fixture, rstest};

    #[fixture]
    fn before_each() -> (Arc<ManualClock>, TtlCache<String>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = TtlCache::new(DEFAULT_TTL, clock.clone());
        (clock, cache)
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_miss_on_an_absent_key(before_each: (Arc<ManualClock>, TtlCache<String>)) {
        let (_, cache) = before_each;
        assert_eq!(cache.get("task_entries:t-1").await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_hit_within_the_ttl(before_each: (Arc<ManualClock>, TtlCache<String>)) {
        let (clock, cache) = before_each;
        cache.set("task_entries:t-1", "cached".to_string()).await;
        clock.advance(Duration::from_secs(4 * 60));
        assert_eq!(cache.get("task_entries:t-1").await, Some("cached".to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_miss_and_evict_once_the_ttl_lapses(
        before_each: (Arc<ManualClock>, TtlCache<String>),
    ) {
        let (clock, cache) = before_each;
        cache.set("task_entries:t-1", "cached".to_string()).await;
        clock.advance(DEFAULT_TTL);
        assert_eq!(cache.get("task_entries:t-1").await, None);
        assert!(cache.is_empty().await);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_restart_the_window_when_overwritten(
        before_each: (Arc<ManualClock>, TtlCache<String>),
    ) {
        let (clock, cache) = before_each;
        cache.set("k", "old".to_string()).await;
        clock.advance(Duration::from_secs(4 * 60));
        cache.set("k", "new".to_string()).await;
        clock.advance(Duration::from_secs(4 * 60));
        assert_eq!(cache.get("k").await, Some("new".to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_drop_an_invalidated_key(before_each: (Arc<ManualClock>, TtlCache<String>)) {
        let (_, cache) = before_each;
        cache.set("a", "1".to_string()).await;
        cache.set("b", "2".to_string()).await;
        assert!(cache.invalidate("a").await);
        assert!(!cache.invalidate("a").await);
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.len().await, 1);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
