use crate::modules::time_entries::adapters::outbound::remote::RemoteError;
use crate::shared::infrastructure::durable_store::DurableStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] DurableStoreError),

    #[error("end time must not be before start time")]
    InvalidInterval,

    #[error("unknown time entry: {0}")]
    UnknownEntry(String),
}
