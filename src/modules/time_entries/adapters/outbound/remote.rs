// Port for the remote persistence service, the source of truth for entries.
//
// Summary lookups report "no rows" as Ok(None), never as an error.

use crate::modules::time_entries::core::summaries::{TaskTimeSummary, UserTaskTimeSummary};
use crate::modules::time_entries::core::time_entry::{NewTimeEntry, TimeEntry, TimeEntryPatch};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("time entry not found: {0}")]
    NotFound(String),

    #[error("remote rejected request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait TimeEntryRemote: Send + Sync {
    async fn create_time_entry(&self, entry: NewTimeEntry) -> Result<TimeEntry, RemoteError>;

    async fn get_open_time_entry(&self, user_ref: &str) -> Result<Option<TimeEntry>, RemoteError>;

    async fn fetch_time_entry(&self, id: &str) -> Result<Option<TimeEntry>, RemoteError>;

    async fn update_time_entry(&self, id: &str, patch: &TimeEntryPatch) -> Result<(), RemoteError>;

    async fn delete_time_entry(&self, id: &str) -> Result<(), RemoteError>;

    async fn list_time_entries_by_task(&self, task_id: &str) -> Result<Vec<TimeEntry>, RemoteError>;

    async fn list_time_entries_by_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<TimeEntry>, RemoteError>;

    async fn get_task_time_summary(
        &self,
        task_id: &str,
    ) -> Result<Option<TaskTimeSummary>, RemoteError>;

    async fn get_user_task_time_summary(
        &self,
        task_id: &str,
        user_id: &str,
    ) -> Result<Option<UserTaskTimeSummary>, RemoteError>;
}
