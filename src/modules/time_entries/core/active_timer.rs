// Active timer state machine.
//
// Holds at most one open entry for the session's user. A start while running
// closes the running entry at the same instant the new one begins.
//
// A freshly started entry is Tentative: it carries a placeholder id that also
// serves as the correlation id for the pending create. The create either
// commits (the entry adopts its remote identity) or rolls back to Idle. Both are
// ignored once the timer has moved on to another entry.
//
// This module performs no input or output.

use crate::modules::time_entries::core::elapsed::elapsed_seconds;
use crate::modules::time_entries::core::time_entry::{TimeEntry, TimeEntryPatch};
use crate::shared::core::primitives::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Tentative,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTimer {
    pub entry: TimeEntry,
    pub phase: Phase,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActiveTimer {
    #[default]
    Idle,
    Running(RunningTimer),
}

/// An entry closed by a transition, with the patch that must reach the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closed {
    pub entry: TimeEntry,
    pub patch: TimeEntryPatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub closed: Option<Closed>,
    pub tentative: TimeEntry,
}

impl ActiveTimer {
    pub fn start(
        &mut self,
        task_ref: &str,
        user_ref: &str,
        description: Option<String>,
        now: Timestamp,
    ) -> Started {
        let closed = self.stop(now);
        let tentative = TimeEntry::tentative(task_ref, user_ref, now, description);
        *self = ActiveTimer::Running(RunningTimer {
            entry: tentative.clone(),
            phase: Phase::Tentative,
        });
        Started { closed, tentative }
    }

    /// Closes the running entry at `now`. Idle stays Idle and yields nothing.
    pub fn stop(&mut self, now: Timestamp) -> Option<Closed> {
        match std::mem::take(self) {
            ActiveTimer::Idle => None,
            ActiveTimer::Running(RunningTimer { mut entry, .. }) => {
                let patch = entry.close(now);
                Some(Closed { entry, patch })
            }
        }
    }

    /// Replaces the tentative entry `placeholder_id` in place with its confirmed identity.
    pub fn commit(&mut self, placeholder_id: &str, confirmed: &TimeEntry) -> bool {
        match self {
            ActiveTimer::Running(running)
                if running.phase == Phase::Tentative && running.entry.id == placeholder_id =>
            {
                running.entry.adopt_confirmed(confirmed);
                running.phase = Phase::Confirmed;
                true
            }
            _ => false,
        }
    }

    pub fn roll_back(&mut self, placeholder_id: &str) -> bool {
        match self {
            ActiveTimer::Running(running)
                if running.phase == Phase::Tentative && running.entry.id == placeholder_id =>
            {
                *self = ActiveTimer::Idle;
                true
            }
            _ => false,
        }
    }

    /// Adopts an open entry already known to the remote. Only applies while Idle.
    pub fn hydrate(&mut self, entry: TimeEntry) -> bool {
        if self.is_running() || !entry.is_open() {
            return false;
        }
        *self = ActiveTimer::Running(RunningTimer {
            entry,
            phase: Phase::Confirmed,
        });
        true
    }

    /// Mirrors a patch aimed at the running entry. A patch that closes it makes the timer Idle.
    pub fn apply(&mut self, entry_id: &str, patch: &TimeEntryPatch) -> Option<Closed> {
        let ActiveTimer::Running(running) = self else {
            return None;
        };
        if running.entry.id != entry_id {
            return None;
        }
        running.entry.apply(patch);
        if running.entry.is_open() {
            return None;
        }
        match std::mem::take(self) {
            ActiveTimer::Running(RunningTimer { entry, .. }) => Some(Closed {
                entry,
                patch: patch.clone(),
            }),
            ActiveTimer::Idle => None,
        }
    }

    /// Drops the running entry if it is `entry_id` (it was deleted).
    pub fn forget(&mut self, entry_id: &str) -> bool {
        if self.running_entry().is_some_and(|entry| entry.id == entry_id) {
            *self = ActiveTimer::Idle;
            return true;
        }
        false
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ActiveTimer::Running(_))
    }

    pub fn running_entry(&self) -> Option<&TimeEntry> {
        match self {
            ActiveTimer::Running(running) => Some(&running.entry),
            ActiveTimer::Idle => None,
        }
    }

    pub fn elapsed_seconds(&self, now: Timestamp) -> Option<i64> {
        self.running_entry()
            .map(|entry| elapsed_seconds(entry.start_time, now))
    }
}
