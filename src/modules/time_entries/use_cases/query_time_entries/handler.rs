// Read side: every query consults the cache first and falls back to the remote
// on a miss, storing what it fetched. Summaries that do not exist are cached as
// `None` like any other answer.

use crate::modules::time_entries::adapters::outbound::remote::{RemoteError, TimeEntryRemote};
use crate::modules::time_entries::core::cache_keys::{self, CachedQuery};
use crate::modules::time_entries::core::summaries::{TaskTimeSummary, UserTaskTimeSummary};
use crate::modules::time_entries::core::time_entry::TimeEntry;
use crate::shared::infrastructure::read_cache::TtlCache;
use std::sync::Arc;
use tracing::debug;

pub struct TimeEntryQueryHandler<R>
where
    R: TimeEntryRemote + 'static,
{
    remote: Arc<R>,
    cache: Arc<TtlCache<CachedQuery>>,
    user_entries_limit: u32,
}

impl<R> TimeEntryQueryHandler<R>
where
    R: TimeEntryRemote + 'static,
{
    pub fn new(remote: Arc<R>, cache: Arc<TtlCache<CachedQuery>>, user_entries_limit: u32) -> Self {
        Self {
            remote,
            cache,
            user_entries_limit,
        }
    }

    pub async fn task_time_entries(&self, task_id: &str) -> Result<Vec<TimeEntry>, RemoteError> {
        let key = cache_keys::task_entries(task_id);
        if let Some(CachedQuery::Entries(entries)) = self.cache.get(&key).await {
            debug!(key = %key, "cache hit");
            return Ok(entries);
        }
        let entries = self.remote.list_time_entries_by_task(task_id).await?;
        self.cache.set(key, CachedQuery::Entries(entries.clone())).await;
        Ok(entries)
    }

    pub async fn user_time_entries(&self, user_id: &str) -> Result<Vec<TimeEntry>, RemoteError> {
        let key = cache_keys::user_entries(user_id);
        if let Some(CachedQuery::Entries(entries)) = self.cache.get(&key).await {
            debug!(key = %key, "cache hit");
            return Ok(entries);
        }
        let entries = self
            .remote
            .list_time_entries_by_user(user_id, self.user_entries_limit)
            .await?;
        self.cache.set(key, CachedQuery::Entries(entries.clone())).await;
        Ok(entries)
    }

    pub async fn task_summary(&self, task_id: &str) -> Result<Option<TaskTimeSummary>, RemoteError> {
        let key = cache_keys::task_summary(task_id);
        if let Some(CachedQuery::TaskSummary(summary)) = self.cache.get(&key).await {
            debug!(key = %key, "cache hit");
            return Ok(summary);
        }
        let summary = self.remote.get_task_time_summary(task_id).await?;
        self.cache.set(key, CachedQuery::TaskSummary(summary)).await;
        Ok(summary)
    }

    pub async fn user_task_summary(
        &self,
        task_id: &str,
        user_id: &str,
    ) -> Result<Option<UserTaskTimeSummary>, RemoteError> {
        let key = cache_keys::user_task_summary(task_id, user_id);
        if let Some(CachedQuery::UserTaskSummary(summary)) = self.cache.get(&key).await {
            debug!(key = %key, "cache hit");
            return Ok(summary);
        }
        let summary = self
            .remote
            .get_user_task_time_summary(task_id, user_id)
            .await?;
        self.cache.set(key, CachedQuery::UserTaskSummary(summary)).await;
        Ok(summary)
    }

    pub async fn invalidate_for(&self, entry: &TimeEntry) {
        for key in cache_keys::touched_by(&entry.task_ref, &entry.user_ref) {
            self.cache.invalidate(&key).await;
        }
    }
}
