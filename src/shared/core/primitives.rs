use uuid::Uuid;

/// Epoch milliseconds.
pub type Timestamp = i64;

const PLACEHOLDER_PREFIX: &str = "local-";

/// Whole seconds between two timestamps, rounded towards negative infinity.
pub fn duration_seconds(start_time: Timestamp, end_time: Timestamp) -> i64 {
    (end_time - start_time).div_euclid(1000)
}

/// Identifier for an entry that exists only locally until its create round-trip resolves.
pub fn placeholder_id() -> String {
    format!("{PLACEHOLDER_PREFIX}{}", Uuid::now_v7())
}

pub fn is_placeholder(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}
