use crate::shared::core::primitives::{Timestamp, duration_seconds};

/// Seconds elapsed since `start_time`; never negative.
pub fn elapsed_seconds(start_time: Timestamp, now: Timestamp) -> i64 {
    duration_seconds(start_time, now).max(0)
}

/// Renders seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
