// Composition root for the time_sessions binary.
//
// Responsibilities
// - Build the concrete adapters from configuration.
// - Open a session for the configured user, replaying writes left by an earlier run.

use crate::modules::time_entries::adapters::outbound::remote_in_memory::InMemoryRemote;
use crate::modules::time_entries::use_cases::track_time::config::SessionConfig;
use crate::modules::time_entries::use_cases::track_time::errors::SessionError;
use crate::modules::time_entries::use_cases::track_time::session::TimeTrackingSession;
use crate::shared::core::clock::{Clock, SystemClock};
use crate::shared::infrastructure::durable_store::json_file::JsonFileStore;
use std::sync::Arc;

pub type LocalSession = TimeTrackingSession<InMemoryRemote, JsonFileStore>;

/// Opens a session whose pending writes live under `config.data_dir`.
pub async fn open_local_session(
    user_ref: &str,
    config: SessionConfig,
) -> Result<(LocalSession, Arc<InMemoryRemote>), SessionError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let remote = Arc::new(InMemoryRemote::new(clock.clone()));
    let store = Arc::new(JsonFileStore::new(config.data_dir.clone()));
    tracing::info!(
        user_ref,
        data_dir = %config.data_dir.display(),
        namespace = %config.pending_namespace,
        "opening session"
    );
    let session = TimeTrackingSession::open(user_ref, remote.clone(), store, clock, config).await?;
    Ok((session, remote))
}
