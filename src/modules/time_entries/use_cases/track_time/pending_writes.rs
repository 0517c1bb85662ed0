// Write-behind coalescing queue for entry patches.
//
// Purpose
// - Collapse bursts of patches to the same entry into one remote write.
// - Keep accepted-but-unconfirmed patches in the durable store until the remote
//   confirms them, so they survive a restart.
//
// Rules
// - enqueue merges into the entry's pending patch (last write wins per field),
//   persists the whole map, and re-arms the debounce timer.
// - flush sends one write per entry. Flushes are serialised, so an entry never
//   has two writes in flight.
// - A confirmed write removes the entry only if nothing was merged into it
//   while the write was in flight; otherwise the newer patch stays queued.
// - A failed write stays queued. There is no backoff: the next enqueue or an
//   explicit flush retries it.
// - Placeholder ids are never sent; they wait for `rekey` or `discard`.

use crate::modules::time_entries::adapters::outbound::remote::{RemoteError, TimeEntryRemote};
use crate::modules::time_entries::core::cache_keys::{self, CachedQuery};
use crate::modules::time_entries::core::time_entry::{TimeEntry, TimeEntryPatch};
use crate::shared::core::primitives::{Timestamp, is_placeholder};
use crate::shared::infrastructure::deferred::Debouncer;
use crate::shared::infrastructure::durable_store::{DurableStoreError, KeyValueStore, Records};
use crate::shared::infrastructure::read_cache::TtlCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub entry_id: String,
    pub patch: TimeEntryPatch,
    /// Last known start of the entry, used to derive `duration` at flush time.
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub task_ref: Option<String>,
    #[serde(default)]
    pub user_ref: Option<String>,
    #[serde(skip)]
    revision: u64,
}

impl PendingUpdate {
    /// The patch as it goes over the wire.
    pub fn outgoing_patch(&self) -> TimeEntryPatch {
        if self.patch.duration.is_some() {
            return self.patch.clone();
        }
        self.patch.clone().with_derived_duration(self.start_time)
    }
}

/// What the queue knows about the entry a patch belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryContext {
    pub start_time: Option<Timestamp>,
    pub task_ref: Option<String>,
    pub user_ref: Option<String>,
}

impl From<&TimeEntry> for EntryContext {
    fn from(entry: &TimeEntry) -> Self {
        Self {
            start_time: Some(entry.start_time),
            task_ref: Some(entry.task_ref.clone()),
            user_ref: Some(entry.user_ref.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub flushed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct Pending {
    updates: BTreeMap<String, PendingUpdate>,
    next_revision: u64,
}

impl Pending {
    fn bump(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    fn records(&self) -> Result<Records, DurableStoreError> {
        self.updates
            .iter()
            .map(|(id, update)| -> Result<_, DurableStoreError> {
                Ok((id.clone(), serde_json::to_value(update)?))
            })
            .collect()
    }
}

pub struct PendingWrites<R, S>
where
    R: TimeEntryRemote + 'static,
    S: KeyValueStore + 'static,
{
    remote: Arc<R>,
    store: Arc<S>,
    cache: Arc<TtlCache<CachedQuery>>,
    namespace: String,
    pending: Mutex<Pending>,
    flushing: Mutex<()>,
    debouncer: Debouncer,
}

impl<R, S> PendingWrites<R, S>
where
    R: TimeEntryRemote + 'static,
    S: KeyValueStore + 'static,
{
    pub fn new(
        remote: Arc<R>,
        store: Arc<S>,
        cache: Arc<TtlCache<CachedQuery>>,
        namespace: impl Into<String>,
        debounce: Duration,
    ) -> Self {
        Self {
            remote,
            store,
            cache,
            namespace: namespace.into(),
            pending: Mutex::new(Pending::default()),
            flushing: Mutex::new(()),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Loads updates persisted by an earlier run. Placeholder-keyed updates are
    /// dropped: their create never confirmed, so no remote entry carries that id.
    pub async fn restore(&self) -> Result<usize, DurableStoreError> {
        let records = self.store.read_all(&self.namespace).await?;
        let mut pending = self.pending.lock().await;
        for (key, value) in records {
            let mut update: PendingUpdate = match serde_json::from_value(value) {
                Ok(update) => update,
                Err(err) => {
                    warn!(key = %key, error = %err, "dropping unreadable pending update");
                    continue;
                }
            };
            if is_placeholder(&update.entry_id) {
                warn!(entry_id = %update.entry_id, "dropping pending update for unconfirmed entry");
                continue;
            }
            update.revision = pending.bump();
            match pending.updates.get_mut(&update.entry_id) {
                Some(existing) => {
                    let mut restored = update.patch;
                    restored.merge(existing.patch.clone());
                    existing.patch = restored;
                }
                None => {
                    pending.updates.insert(update.entry_id.clone(), update);
                }
            }
        }
        self.persist(&pending).await;
        info!(pending = pending.updates.len(), "pending updates restored");
        Ok(pending.updates.len())
    }

    pub async fn enqueue(self: &Arc<Self>, entry_id: &str, patch: TimeEntryPatch, context: EntryContext) {
        {
            let mut pending = self.pending.lock().await;
            let revision = pending.bump();
            match pending.updates.get_mut(entry_id) {
                Some(existing) => {
                    existing.patch.merge(patch);
                    existing.revision = revision;
                    existing.start_time = context.start_time.or(existing.start_time);
                    existing.task_ref = context.task_ref.or(existing.task_ref.take());
                    existing.user_ref = context.user_ref.or(existing.user_ref.take());
                }
                None => {
                    pending.updates.insert(
                        entry_id.to_string(),
                        PendingUpdate {
                            entry_id: entry_id.to_string(),
                            patch,
                            start_time: context.start_time,
                            task_ref: context.task_ref,
                            user_ref: context.user_ref,
                            revision,
                        },
                    );
                }
            }
            self.persist(&pending).await;
            debug!(entry_id, pending = pending.updates.len(), "patch queued");
        }
        self.schedule_flush();
    }

    /// Moves a placeholder's pending patch onto the id the remote assigned.
    pub async fn rekey(self: &Arc<Self>, from: &str, to: &str) -> bool {
        {
            let mut pending = self.pending.lock().await;
            let Some(mut moved) = pending.updates.remove(from) else {
                return false;
            };
            moved.entry_id = to.to_string();
            moved.revision = pending.bump();
            if let Some(existing) = pending.updates.remove(to) {
                moved.patch.merge(existing.patch);
            }
            pending.updates.insert(to.to_string(), moved);
            self.persist(&pending).await;
            debug!(from, to, "pending update re-keyed");
        }
        self.schedule_flush();
        true
    }

    pub async fn discard(&self, entry_id: &str) -> bool {
        let mut pending = self.pending.lock().await;
        let removed = pending.updates.remove(entry_id).is_some();
        if removed {
            self.persist(&pending).await;
            debug!(entry_id, "pending update discarded");
        }
        removed
    }

    pub async fn flush(&self) -> FlushReport {
        let _flushing = self.flushing.lock().await;
        let batch: Vec<PendingUpdate> = self.pending.lock().await.updates.values().cloned().collect();
        let mut report = FlushReport::default();

        for update in batch {
            if is_placeholder(&update.entry_id) {
                report.skipped.push(update.entry_id);
                continue;
            }
            let patch = update.outgoing_patch();
            match self.remote.update_time_entry(&update.entry_id, &patch).await {
                Ok(()) => {
                    self.confirm(&update).await;
                    report.flushed.push(update.entry_id);
                }
                Err(RemoteError::NotFound(_)) => {
                    warn!(entry_id = %update.entry_id, "entry no longer exists remotely, dropping its pending update");
                    self.confirm(&update).await;
                    report.failed.push(update.entry_id);
                }
                Err(err) => {
                    warn!(entry_id = %update.entry_id, error = %err, "pending update not flushed, keeping it for retry");
                    report.failed.push(update.entry_id);
                }
            }
        }

        if !report.flushed.is_empty() || !report.failed.is_empty() {
            info!(
                flushed = report.flushed.len(),
                failed = report.failed.len(),
                skipped = report.skipped.len(),
                "pending updates flushed"
            );
        }
        report
    }

    pub async fn pending_update(&self, entry_id: &str) -> Option<PendingUpdate> {
        self.pending.lock().await.updates.get(entry_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.updates.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.updates.is_empty()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.debouncer.is_scheduled()
    }

    pub fn cancel_scheduled_flush(&self) -> bool {
        self.debouncer.cancel()
    }

    fn schedule_flush(self: &Arc<Self>) {
        let queue = Arc::downgrade(self);
        self.debouncer.schedule(async move {
            if let Some(queue) = queue.upgrade() {
                queue.flush().await;
            }
        });
    }

    async fn confirm(&self, sent: &PendingUpdate) {
        {
            let mut pending = self.pending.lock().await;
            let unchanged = pending
                .updates
                .get(&sent.entry_id)
                .is_some_and(|current| current.revision == sent.revision);
            if unchanged {
                pending.updates.remove(&sent.entry_id);
                self.persist(&pending).await;
            }
        }
        if let (Some(task_ref), Some(user_ref)) = (&sent.task_ref, &sent.user_ref) {
            for key in cache_keys::touched_by(task_ref, user_ref) {
                self.cache.invalidate(&key).await;
            }
        }
    }

    async fn persist(&self, pending: &Pending) {
        let result = if pending.updates.is_empty() {
            self.store.clear(&self.namespace).await
        } else {
            match pending.records() {
                Ok(records) => self.store.write_all(&self.namespace, &records).await,
                Err(err) => Err(err),
            }
        };
        if let Err(err) = result {
            warn!(namespace = %self.namespace, error = %err, "pending updates not persisted");
        }
    }
}
