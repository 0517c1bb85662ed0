// In memory implementation of the TimeEntryRemote port.
//
// Purpose
// - Stand in for the hosted service in tests and in the demo binary.
//
// Responsibilities
// - Hold the authoritative entries and assign remote ids.
// - Recompute `duration` on every update, as the hosted service does.
// - Record every call so tests can count round-trips.
// - Simulate outages and slow responses.

use crate::modules::time_entries::adapters::outbound::remote::{RemoteError, TimeEntryRemote};
use crate::modules::time_entries::core::summaries::{TaskTimeSummary, UserTaskTimeSummary};
use crate::modules::time_entries::core::time_entry::{NewTimeEntry, TimeEntry, TimeEntryPatch};
use crate::shared::core::clock::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create { task_ref: String },
    GetOpen { user_ref: String },
    Fetch { id: String },
    Update { id: String, patch: TimeEntryPatch },
    Delete { id: String },
    ListByTask { task_id: String },
    ListByUser { user_id: String, limit: u32 },
    TaskSummary { task_id: String },
    UserTaskSummary { task_id: String, user_id: String },
}

#[derive(Debug)]
pub struct InMemoryRemote {
    entries: RwLock<Vec<TimeEntry>>,
    calls: Mutex<Vec<RemoteCall>>,
    is_offline: AtomicBool,
    rejects_deletes: AtomicBool,
    delay_ms: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl InMemoryRemote {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            is_offline: AtomicBool::new(false),
            rejects_deletes: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            clock,
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.is_offline.store(offline, Ordering::SeqCst);
    }

    /// Deletes fail with `Rejected` while every other call keeps working.
    pub fn set_rejects_deletes(&self, rejects: bool) {
        self.rejects_deletes.store(rejects, Ordering::SeqCst);
    }

    pub fn set_delay_ms(&self, delay_ms: u64) {
        self.delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub async fn seed(&self, entry: TimeEntry) {
        self.entries.write().await.push(entry);
    }

    pub async fn entries(&self) -> Vec<TimeEntry> {
        self.entries.read().await.clone()
    }

    pub async fn entry(&self, id: &str) -> Option<TimeEntry> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    pub async fn update_calls(&self) -> Vec<(String, TimeEntryPatch)> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Update { id, patch } => Some((id.clone(), patch.clone())),
                _ => None,
            })
            .collect()
    }

    async fn round_trip(&self, call: RemoteCall) -> Result<(), RemoteError> {
        self.calls.lock().await.push(call);
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("Remote offline".into()));
        }
        Ok(())
    }
}

fn newest_first(mut entries: Vec<TimeEntry>) -> Vec<TimeEntry> {
    entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    entries
}

#[async_trait::async_trait]
impl TimeEntryRemote for InMemoryRemote {
    async fn create_time_entry(&self, entry: NewTimeEntry) -> Result<TimeEntry, RemoteError> {
        self.round_trip(RemoteCall::Create {
            task_ref: entry.task_ref.clone(),
        })
        .await?;
        let now = self.clock.now_ms();
        let created = TimeEntry {
            id: Uuid::now_v7().to_string(),
            task_ref: entry.task_ref,
            user_ref: entry.user_ref,
            start_time: entry.start_time,
            end_time: None,
            duration: None,
            description: entry.description,
            created_at: now,
            updated_at: now,
        };
        self.entries.write().await.push(created.clone());
        Ok(created)
    }

    async fn get_open_time_entry(&self, user_ref: &str) -> Result<Option<TimeEntry>, RemoteError> {
        self.round_trip(RemoteCall::GetOpen {
            user_ref: user_ref.to_string(),
        })
        .await?;
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|entry| entry.user_ref == user_ref && entry.is_open())
            .max_by_key(|entry| entry.start_time)
            .cloned())
    }

    async fn fetch_time_entry(&self, id: &str) -> Result<Option<TimeEntry>, RemoteError> {
        self.round_trip(RemoteCall::Fetch { id: id.to_string() })
            .await?;
        Ok(self.entry(id).await)
    }

    async fn update_time_entry(&self, id: &str, patch: &TimeEntryPatch) -> Result<(), RemoteError> {
        self.round_trip(RemoteCall::Update {
            id: id.to_string(),
            patch: patch.clone(),
        })
        .await?;
        let now = self.clock.now_ms();
        let mut guard = self.entries.write().await;
        let entry = guard
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        entry.apply(patch);
        entry.updated_at = now;
        Ok(())
    }

    async fn delete_time_entry(&self, id: &str) -> Result<(), RemoteError> {
        self.round_trip(RemoteCall::Delete { id: id.to_string() })
            .await?;
        if self.rejects_deletes.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected(format!("delete of {id} refused")));
        }
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|entry| entry.id != id);
        if guard.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_time_entries_by_task(&self, task_id: &str) -> Result<Vec<TimeEntry>, RemoteError> {
        self.round_trip(RemoteCall::ListByTask {
            task_id: task_id.to_string(),
        })
        .await?;
        let guard = self.entries.read().await;
        Ok(newest_first(
            guard
                .iter()
                .filter(|entry| entry.task_ref == task_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_time_entries_by_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<TimeEntry>, RemoteError> {
        self.round_trip(RemoteCall::ListByUser {
            user_id: user_id.to_string(),
            limit,
        })
        .await?;
        let guard = self.entries.read().await;
        let mut entries = newest_first(
            guard
                .iter()
                .filter(|entry| entry.user_ref == user_id)
                .cloned()
                .collect(),
        );
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn get_task_time_summary(
        &self,
        task_id: &str,
    ) -> Result<Option<TaskTimeSummary>, RemoteError> {
        self.round_trip(RemoteCall::TaskSummary {
            task_id: task_id.to_string(),
        })
        .await?;
        let guard = self.entries.read().await;
        let on_task: Vec<&TimeEntry> = guard.iter().filter(|e| e.task_ref == task_id).collect();
        if on_task.is_empty() {
            return Ok(None);
        }
        let contributors: HashSet<&str> = on_task.iter().map(|e| e.user_ref.as_str()).collect();
        Ok(Some(TaskTimeSummary {
            total_duration: on_task.iter().filter_map(|e| e.duration).sum(),
            unique_contributors: u32::try_from(contributors.len()).unwrap_or(u32::MAX),
        }))
    }

    async fn get_user_task_time_summary(
        &self,
        task_id: &str,
        user_id: &str,
    ) -> Result<Option<UserTaskTimeSummary>, RemoteError> {
        self.round_trip(RemoteCall::UserTaskSummary {
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
        })
        .await?;
        let guard = self.entries.read().await;
        let mut matching = guard
            .iter()
            .filter(|e| e.task_ref == task_id && e.user_ref == user_id)
            .peekable();
        if matching.peek().is_none() {
            return Ok(None);
        }
        Ok(Some(UserTaskTimeSummary {
            total_duration: matching.filter_map(|e| e.duration).sum(),
        }))
    }
}
