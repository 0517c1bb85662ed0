use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTimeSummary {
    /// Seconds tracked on the task across all users.
    pub total_duration: i64,
    pub unique_contributors: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTaskTimeSummary {
    pub total_duration: i64,
}
