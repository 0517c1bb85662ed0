// Session facade over the active timer, the read cache and the write-behind queue.
//
// Writes are optimistic: local state changes before the remote is awaited.
// - start: tentative entry, then commit on create success or roll back on failure.
//   Create failures are returned to the caller.
// - stop and update: applied locally, queued, never rolled back. Remote
//   failures are logged and retried through the queue.
// - delete: removed locally; on remote failure the authoritative record is
//   re-read and put back with any still-queued patch applied. The queued patch
//   is only dropped once the remote confirms the delete.
//
// One session serves one user. It owns its cache, queue and timer; nothing is
// shared between sessions except what the caller passes in.

use crate::modules::time_entries::adapters::outbound::remote::TimeEntryRemote;
use crate::modules::time_entries::core::active_timer::{ActiveTimer, Closed};
use crate::modules::time_entries::core::elapsed::format_elapsed;
use crate::modules::time_entries::core::summaries::{TaskTimeSummary, UserTaskTimeSummary};
use crate::modules::time_entries::core::time_entry::{NewTimeEntry, TimeEntry, TimeEntryPatch};
use crate::modules::time_entries::use_cases::query_time_entries::handler::TimeEntryQueryHandler;
use crate::modules::time_entries::use_cases::track_time::config::SessionConfig;
use crate::modules::time_entries::use_cases::track_time::errors::SessionError;
use crate::modules::time_entries::use_cases::track_time::pending_writes::{
    EntryContext, FlushReport, PendingWrites,
};
use crate::modules::time_entries::use_cases::track_time::ticker::spawn_elapsed_ticker;
use crate::shared::core::clock::Clock;
use crate::shared::core::primitives::is_placeholder;
use crate::shared::infrastructure::durable_store::KeyValueStore;
use crate::shared::infrastructure::read_cache::TtlCache;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

pub struct TimeTrackingSession<R, S>
where
    R: TimeEntryRemote + 'static,
    S: KeyValueStore + 'static,
{
    user_ref: String,
    remote: Arc<R>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    timer: Arc<Mutex<ActiveTimer>>,
    entries: Mutex<Vec<TimeEntry>>,
    /// Every entry a query returned, by id. Supplies start time and task/user
    /// refs for entries outside the user's own listing.
    observed: Mutex<HashMap<String, TimeEntry>>,
    queue: Arc<PendingWrites<R, S>>,
    queries: TimeEntryQueryHandler<R>,
}

impl<R, S> TimeTrackingSession<R, S>
where
    R: TimeEntryRemote + 'static,
    S: KeyValueStore + 'static,
{
    /// Replays writes persisted by an earlier run, then picks up the user's open
    /// entry from the remote. Returns once the replay has been attempted.
    pub async fn open(
        user_ref: impl Into<String>,
        remote: Arc<R>,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let user_ref = user_ref.into();
        let cache = Arc::new(TtlCache::new(config.cache_ttl, clock.clone()));
        let queue = Arc::new(PendingWrites::new(
            remote.clone(),
            store,
            cache.clone(),
            config.pending_namespace.clone(),
            config.debounce,
        ));

        if queue.restore().await? > 0 {
            let report = queue.flush().await;
            info!(
                user_ref = %user_ref,
                replayed = report.flushed.len(),
                still_pending = report.failed.len(),
                "pending writes replayed"
            );
        }

        let session = Self {
            queries: TimeEntryQueryHandler::new(remote.clone(), cache, config.user_entries_limit),
            user_ref,
            remote,
            clock,
            config,
            timer: Arc::new(Mutex::new(ActiveTimer::Idle)),
            entries: Mutex::new(Vec::new()),
            observed: Mutex::new(HashMap::new()),
            queue,
        };
        session.hydrate().await;
        Ok(session)
    }

    pub fn user_ref(&self) -> &str {
        &self.user_ref
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn start_timer(
        &self,
        task_ref: &str,
        description: Option<String>,
    ) -> Result<TimeEntry, SessionError> {
        let started = self.timer.lock().await.start(
            task_ref,
            &self.user_ref,
            description,
            self.clock.now_ms(),
        );
        if let Some(closed) = started.closed {
            info!(entry_id = %closed.entry.id, duration = ?closed.entry.duration, "running timer closed by start");
            self.record_close(closed).await;
        }

        let placeholder = started.tentative.id.clone();
        self.entries.lock().await.insert(0, started.tentative.clone());
        info!(entry_id = %placeholder, task_ref, "timer started");

        match self
            .remote
            .create_time_entry(NewTimeEntry::from(&started.tentative))
            .await
        {
            Ok(confirmed) => Ok(self.commit_start(&placeholder, confirmed).await),
            Err(err) => {
                self.roll_back_start(&placeholder).await;
                error!(task_ref, error = %err, "timer start rejected, rolled back");
                Err(err.into())
            }
        }
    }

    /// Closes the running entry. Does nothing while idle.
    pub async fn stop_timer(&self) -> Option<TimeEntry> {
        let closed = self.timer.lock().await.stop(self.clock.now_ms())?;
        info!(entry_id = %closed.entry.id, duration = ?closed.entry.duration, "timer stopped");
        let entry = closed.entry.clone();
        self.record_close(closed).await;
        Some(entry)
    }

    pub async fn update_entry(
        &self,
        entry_id: &str,
        patch: TimeEntryPatch,
    ) -> Result<(), SessionError> {
        if patch.is_empty() {
            return Ok(());
        }
        if is_placeholder(entry_id) && self.known_entry(entry_id).await.is_none() {
            return Err(SessionError::UnknownEntry(entry_id.to_string()));
        }
        let known = self.resolve_entry(entry_id).await;
        let start_time = known.as_ref().map(|entry| entry.start_time);
        if let (Some(start_time), Some(end_time)) = (start_time, patch.end_time) {
            if end_time < start_time {
                return Err(SessionError::InvalidInterval);
            }
        }
        let patch = TimeEntryPatch {
            duration: None,
            ..patch
        }
        .with_derived_duration(start_time);

        if let Some(closed) = self.timer.lock().await.apply(entry_id, &patch) {
            info!(entry_id, duration = ?closed.entry.duration, "timer stopped by update");
        }
        {
            let now = self.clock.now_ms();
            let mut entries = self.entries.lock().await;
            if let Some(local) = entries.iter_mut().find(|entry| entry.id == entry_id) {
                local.apply(&patch);
                local.updated_at = now;
            }
        }
        let context = known.as_ref().map(EntryContext::from).unwrap_or_default();
        self.queue.enqueue(entry_id, patch, context).await;
        Ok(())
    }

    pub async fn delete_entry(&self, entry_id: &str) {
        let removed = {
            let mut entries = self.entries.lock().await;
            entries
                .iter()
                .position(|entry| entry.id == entry_id)
                .map(|index| (index, entries.remove(index)))
        };
        if self.timer.lock().await.forget(entry_id) {
            info!(entry_id, "running entry deleted");
        }

        if is_placeholder(entry_id) {
            // the create commit notices the entry is gone and deletes it remotely
            self.queue.discard(entry_id).await;
            debug!(entry_id, "tentative entry deleted locally");
            return;
        }

        let reference = match &removed {
            Some((_, entry)) => Some(entry.clone()),
            None => self.resolve_entry(entry_id).await,
        };
        match self.remote.delete_time_entry(entry_id).await {
            Ok(()) => {
                self.queue.discard(entry_id).await;
                self.observed.lock().await.remove(entry_id);
                match &reference {
                    Some(entry) => self.queries.invalidate_for(entry).await,
                    None => warn!(entry_id, "deleted entry has no known task or user, cache left as is"),
                }
                info!(entry_id, "time entry deleted");
            }
            Err(err) => {
                warn!(entry_id, error = %err, "delete failed, restoring from remote");
                self.restore_deleted(entry_id, removed.map(|(index, _)| index))
                    .await;
            }
        }
    }

    pub async fn get_task_time_entries(&self, task_id: &str) -> Result<Vec<TimeEntry>, SessionError> {
        let entries = self.queries.task_time_entries(task_id).await?;
        self.observe(&entries).await;
        Ok(entries)
    }

    /// Entries of `user_id`, or of the session's user when `None`.
    pub async fn get_user_time_entries(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<TimeEntry>, SessionError> {
        let user_id = user_id.unwrap_or(&self.user_ref);
        let entries = self.queries.user_time_entries(user_id).await?;
        self.observe(&entries).await;
        if user_id == self.user_ref {
            self.remember(&entries).await;
        }
        Ok(entries)
    }

    pub async fn get_task_summary(
        &self,
        task_id: &str,
    ) -> Result<Option<TaskTimeSummary>, SessionError> {
        Ok(self.queries.task_summary(task_id).await?)
    }

    pub async fn get_user_task_summary(
        &self,
        task_id: &str,
        user_id: Option<&str>,
    ) -> Result<Option<UserTaskTimeSummary>, SessionError> {
        let user_id = user_id.unwrap_or(&self.user_ref);
        Ok(self.queries.user_task_summary(task_id, user_id).await?)
    }

    pub async fn active_timer(&self) -> ActiveTimer {
        self.timer.lock().await.clone()
    }

    pub async fn active_entry(&self) -> Option<TimeEntry> {
        self.timer.lock().await.running_entry().cloned()
    }

    pub async fn is_running(&self) -> bool {
        self.timer.lock().await.is_running()
    }

    /// Entries known to this session, newest start first, with local changes applied.
    pub async fn local_entries(&self) -> Vec<TimeEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn elapsed_seconds(&self) -> Option<i64> {
        self.timer
            .lock()
            .await
            .elapsed_seconds(self.clock.now_ms())
    }

    pub async fn elapsed_display(&self) -> Option<String> {
        self.elapsed_seconds().await.map(format_elapsed)
    }

    /// Elapsed seconds published every tick while the session lives.
    pub fn watch_elapsed(&self) -> watch::Receiver<Option<i64>> {
        spawn_elapsed_ticker(
            Arc::downgrade(&self.timer),
            self.clock.clone(),
            self.config.tick_interval,
        )
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.len().await
    }

    pub async fn flush(&self) -> FlushReport {
        self.queue.flush().await
    }

    /// Cancels the debounce timer and makes a final flush attempt. Anything still
    /// unconfirmed stays in the durable store for the next `open`.
    pub async fn shutdown(&self) -> FlushReport {
        self.queue.cancel_scheduled_flush();
        let report = self.queue.flush().await;
        info!(
            user_ref = %self.user_ref,
            flushed = report.flushed.len(),
            still_pending = report.failed.len() + report.skipped.len(),
            "session shut down"
        );
        report
    }

    async fn hydrate(&self) {
        let open = match self.remote.get_open_time_entry(&self.user_ref).await {
            Ok(Some(open)) => open,
            Ok(None) => return,
            Err(err) => {
                warn!(user_ref = %self.user_ref, error = %err, "could not load the open entry");
                return;
            }
        };
        let closing_queued = self
            .queue
            .pending_update(&open.id)
            .await
            .is_some_and(|update| update.patch.end_time.is_some());
        if closing_queued {
            debug!(entry_id = %open.id, "open entry already has a queued close");
            return;
        }
        self.remember(std::slice::from_ref(&open)).await;
        if self.timer.lock().await.hydrate(open) {
            info!(user_ref = %self.user_ref, "running timer resumed");
        }
    }

    async fn record_close(&self, closed: Closed) {
        {
            let mut entries = self.entries.lock().await;
            if let Some(local) = entries.iter_mut().find(|entry| entry.id == closed.entry.id) {
                *local = closed.entry.clone();
            }
        }
        let context = EntryContext::from(&closed.entry);
        self.queue
            .enqueue(&closed.entry.id, closed.patch, context)
            .await;
    }

    async fn commit_start(&self, placeholder: &str, confirmed: TimeEntry) -> TimeEntry {
        self.timer.lock().await.commit(placeholder, &confirmed);
        let local = {
            let mut entries = self.entries.lock().await;
            entries
                .iter_mut()
                .find(|entry| entry.id == placeholder)
                .map(|local| {
                    local.adopt_confirmed(&confirmed);
                    local.clone()
                })
        };
        self.queue.rekey(placeholder, &confirmed.id).await;
        self.queries.invalidate_for(&confirmed).await;

        match local {
            Some(local) => {
                debug!(placeholder, entry_id = %local.id, "timer start confirmed");
                local
            }
            None => {
                warn!(entry_id = %confirmed.id, "entry deleted before its create confirmed, deleting remotely");
                if let Err(err) = self.remote.delete_time_entry(&confirmed.id).await {
                    warn!(entry_id = %confirmed.id, error = %err, "remote delete of abandoned entry failed");
                }
                confirmed
            }
        }
    }

    async fn roll_back_start(&self, placeholder: &str) {
        self.timer.lock().await.roll_back(placeholder);
        self.entries
            .lock()
            .await
            .retain(|entry| entry.id != placeholder);
        self.queue.discard(placeholder).await;
    }

    async fn restore_deleted(&self, entry_id: &str, index: Option<usize>) {
        let mut authoritative = match self.remote.fetch_time_entry(entry_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(entry_id, "entry is gone remotely, nothing to restore");
                return;
            }
            Err(err) => {
                warn!(entry_id, error = %err, "could not re-read deleted entry");
                return;
            }
        };
        if let Some(update) = self.queue.pending_update(entry_id).await {
            authoritative.apply(&update.patch);
        }
        {
            let mut entries = self.entries.lock().await;
            if !entries.iter().any(|entry| entry.id == entry_id) {
                let at = index.unwrap_or(0).min(entries.len());
                entries.insert(at, authoritative.clone());
            }
        }
        if authoritative.user_ref == self.user_ref && authoritative.is_open() {
            self.timer.lock().await.hydrate(authoritative);
        }
        info!(entry_id, "deleted entry restored");
    }

    async fn known_entry(&self, entry_id: &str) -> Option<TimeEntry> {
        let listed = self
            .entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.id == entry_id)
            .cloned();
        match listed {
            Some(entry) => Some(entry),
            None => self
                .timer
                .lock()
                .await
                .running_entry()
                .filter(|entry| entry.id == entry_id)
                .cloned(),
        }
    }

    /// Local copy first, then an observed query result, then the remote record.
    async fn resolve_entry(&self, entry_id: &str) -> Option<TimeEntry> {
        if let Some(entry) = self.known_entry(entry_id).await {
            return Some(entry);
        }
        if let Some(entry) = self.observed.lock().await.get(entry_id).cloned() {
            return Some(entry);
        }
        match self.remote.fetch_time_entry(entry_id).await {
            Ok(found) => found,
            Err(err) => {
                warn!(entry_id, error = %err, "could not read entry, continuing without it");
                None
            }
        }
    }

    async fn observe(&self, fetched: &[TimeEntry]) {
        let mut observed = self.observed.lock().await;
        for entry in fetched {
            observed.insert(entry.id.clone(), entry.clone());
        }
    }

    async fn remember(&self, fetched: &[TimeEntry]) {
        let mut entries = self.entries.lock().await;
        for entry in fetched {
            if !entries.iter().any(|known| known.id == entry.id) {
                entries.push(entry.clone());
            }
        }
        entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    }
}
