// Composite cache keys and the values stored under them.
//
// A key is `<query kind>:<parameters>`. `touched_by` lists every key whose value
// may change when an entry on `task_ref` owned by `user_ref` is written.

use crate::modules::time_entries::core::summaries::{TaskTimeSummary, UserTaskTimeSummary};
use crate::modules::time_entries::core::time_entry::TimeEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedQuery {
    Entries(Vec<TimeEntry>),
    TaskSummary(Option<TaskTimeSummary>),
    UserTaskSummary(Option<UserTaskTimeSummary>),
}

pub fn task_entries(task_id: &str) -> String {
    format!("task_entries:{task_id}")
}

pub fn user_entries(user_id: &str) -> String {
    format!("user_entries:{user_id}")
}

pub fn task_summary(task_id: &str) -> String {
    format!("task_summary:{task_id}")
}

pub fn user_task_summary(task_id: &str, user_id: &str) -> String {
    format!("user_task_summary:{task_id}:{user_id}")
}

pub fn touched_by(task_ref: &str, user_ref: &str) -> [String; 4] {
    [
        task_entries(task_ref),
        task_summary(task_ref),
        user_task_summary(task_ref, user_ref),
        user_entries(user_ref),
    ]
}
