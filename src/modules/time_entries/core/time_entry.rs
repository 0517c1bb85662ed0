// TimeEntry is one tracked work interval as the engine sees it.
//
// Notes
// - All timestamps are epoch milliseconds; `duration` is whole seconds.
// - `end_time` present means the entry is closed. `duration` is derived from
//   `start_time` and `end_time` every time the entry changes and is never
//   taken from a patch as-is.
// - `start_time` is fixed at creation; patches cannot carry it.

use crate::shared::core::primitives::{Timestamp, duration_seconds, placeholder_id};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub task_ref: String,
    pub user_ref: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration: Option<i64>,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TimeEntry {
    /// Optimistic copy shown while the create round-trip is in flight.
    pub fn tentative(
        task_ref: impl Into<String>,
        user_ref: impl Into<String>,
        start_time: Timestamp,
        description: Option<String>,
    ) -> Self {
        Self {
            id: placeholder_id(),
            task_ref: task_ref.into(),
            user_ref: user_ref.into(),
            start_time,
            end_time: None,
            duration: None,
            description,
            created_at: start_time,
            updated_at: start_time,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn apply(&mut self, patch: &TimeEntryPatch) {
        if let Some(end_time) = patch.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        self.duration = self
            .end_time
            .map(|end_time| duration_seconds(self.start_time, end_time));
    }

    /// Closes the entry at `end_time` and returns the patch that carries the close.
    pub fn close(&mut self, end_time: Timestamp) -> TimeEntryPatch {
        let end_time = end_time.max(self.start_time);
        let patch = TimeEntryPatch::closing(end_time, self.start_time);
        self.apply(&patch);
        self.updated_at = end_time;
        patch
    }

    /// Takes over the remote identity of `confirmed` while keeping local changes.
    pub fn adopt_confirmed(&mut self, confirmed: &TimeEntry) {
        self.id = confirmed.id.clone();
        self.start_time = confirmed.start_time;
        self.created_at = confirmed.created_at;
        self.updated_at = self.updated_at.max(confirmed.updated_at);
        self.duration = self
            .end_time
            .map(|end_time| duration_seconds(self.start_time, end_time));
    }
}

/// Request shape for the remote create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub task_ref: String,
    pub user_ref: String,
    pub start_time: Timestamp,
    pub description: Option<String>,
}

impl From<&TimeEntry> for NewTimeEntry {
    fn from(entry: &TimeEntry) -> Self {
        Self {
            task_ref: entry.task_ref.clone(),
            user_ref: entry.user_ref.clone(),
            start_time: entry.start_time,
            description: entry.description.clone(),
        }
    }
}

/// Partial update to an entry. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TimeEntryPatch {
    pub fn closing(end_time: Timestamp, start_time: Timestamp) -> Self {
        Self {
            end_time: Some(end_time),
            duration: Some(duration_seconds(start_time, end_time)),
            description: None,
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn end_time(end_time: Timestamp) -> Self {
        Self {
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end_time.is_none() && self.duration.is_none() && self.description.is_none()
    }

    /// Folds a newer patch into this one; fields present in `newer` win.
    pub fn merge(&mut self, newer: TimeEntryPatch) {
        if newer.end_time.is_some() {
            self.end_time = newer.end_time;
            // a new end time invalidates a duration computed for the old one
            self.duration = newer.duration;
        } else if newer.duration.is_some() {
            self.duration = newer.duration;
        }
        if newer.description.is_some() {
            self.description = newer.description;
        }
    }

    /// Fills in `duration` when the patch closes the entry and the start is known.
    pub fn with_derived_duration(mut self, start_time: Option<Timestamp>) -> Self {
        if let (Some(end_time), Some(start_time)) = (self.end_time, start_time) {
            self.duration = Some(duration_seconds(start_time, end_time));
        }
        self
    }
}
