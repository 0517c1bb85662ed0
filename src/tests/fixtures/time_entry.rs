// Shared test fixture for TimeEntry values, seeded from a JSON document.

use crate::modules::time_entries::core::time_entry::TimeEntry;
use crate::shared::core::primitives::duration_seconds;
use serde::Deserialize;

const FIXTURE: &str = include_str!("json/time_entry.json");

// JSON -> DTO (transport shape)
#[derive(Debug, Clone, Deserialize)]
pub struct TimeEntryDto {
    pub id: String,
    pub task_ref: String,
    pub user_ref: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub description: Option<String>,
}

pub struct TimeEntryBuilder {
    inner: TimeEntry,
}

impl Default for TimeEntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl TimeEntryBuilder {
    pub fn new() -> Self {
        let dto: TimeEntryDto = serde_json::from_str(FIXTURE).unwrap();
        Self {
            inner: TimeEntry {
                id: dto.id,
                task_ref: dto.task_ref,
                user_ref: dto.user_ref,
                start_time: dto.start_time,
                end_time: dto.end_time,
                duration: None,
                description: dto.description,
                created_at: dto.start_time,
                updated_at: dto.end_time.unwrap_or(dto.start_time),
            },
        }
    }

    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.inner.id = v.into();
        self
    }

    pub fn task_ref(mut self, v: impl Into<String>) -> Self {
        self.inner.task_ref = v.into();
        self
    }

    pub fn user_ref(mut self, v: impl Into<String>) -> Self {
        self.inner.user_ref = v.into();
        self
    }

    /// Moves the start and keeps the entry's length.
    pub fn start_time(mut self, v: i64) -> Self {
        let length = self.inner.end_time.map(|end| end - self.inner.start_time);
        self.inner.start_time = v;
        self.inner.created_at = v;
        self.inner.end_time = length.map(|length| v + length);
        self
    }

    pub fn end_time(mut self, v: i64) -> Self {
        self.inner.end_time = Some(v);
        self
    }

    pub fn open(mut self) -> Self {
        self.inner.end_time = None;
        self
    }

    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.inner.description = Some(v.into());
        self
    }

    pub fn build(mut self) -> TimeEntry {
        self.inner.duration = self
            .inner
            .end_time
            .map(|end| duration_seconds(self.inner.start_time, end));
        self.inner.updated_at = self.inner.end_time.unwrap_or(self.inner.start_time);
        self.inner
    }
}

#[cfg(test)]
mod time_entry_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_delegates_to_new_and_parses_json() {
        let built = TimeEntryBuilder::default().build();
        assert_eq!(built.id, "te-fixed-0001");
        assert_eq!(built.user_ref, "user-fixed-0001");
        assert_eq!(built.start_time, 1_700_000_000_000);
        assert_eq!(built.end_time, Some(1_700_000_360_000));
        assert_eq!(built.duration, Some(360));
    }

    #[rstest]
    fn setters_override_fields_and_build_derives_the_duration() {
        let built = TimeEntryBuilder::new()
            .id("te-2")
            .task_ref("task-2")
            .user_ref("user-2")
            .start_time(0)
            .end_time(90_000)
            .description("desc")
            .build();
        assert_eq!(built.id, "te-2");
        assert_eq!(built.task_ref, "task-2");
        assert_eq!(built.user_ref, "user-2");
        assert_eq!(built.duration, Some(90));
        assert_eq!(built.description.as_deref(), Some("desc"));

        let open = TimeEntryBuilder::new().open().build();
        assert!(open.is_open());
        assert_eq!(open.duration, None);
    }
}
