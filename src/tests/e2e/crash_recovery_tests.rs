use crate::modules::time_entries::adapters::outbound::remote_in_memory::InMemoryRemote;
use crate::modules::time_entries::use_cases::track_time::config::SessionConfig;
use crate::modules::time_entries::use_cases::track_time::session::TimeTrackingSession;
use crate::shared::core::clock::ManualClock;
use crate::shared::infrastructure::durable_store::KeyValueStore;
use crate::shared::infrastructure::durable_store::in_memory::InMemoryKeyValueStore;
use crate::shared::infrastructure::durable_store::json_file::JsonFileStore;
use std::sync::Arc;
use std::time::Duration;

const USER: &str = "user-fixed-0001";
const T0: i64 = 1_700_000_000_000;

async fn open<S: KeyValueStore + 'static>(
    clock: &Arc<ManualClock>,
    remote: &Arc<InMemoryRemote>,
    store: &Arc<S>,
) -> TimeTrackingSession<InMemoryRemote, S> {
    TimeTrackingSession::open(
        USER,
        remote.clone(),
        store.clone(),
        clock.clone(),
        SessionConfig::default(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn replays_a_close_persisted_before_a_crash() {
    let clock = Arc::new(ManualClock::new(T0));
    let remote = Arc::new(InMemoryRemote::new(clock.clone()));
    let store = Arc::new(InMemoryKeyValueStore::new());
    let namespace = SessionConfig::default().pending_namespace;

    let started = {
        let session = open(&clock, &remote, &store).await;
        let started = session.start_timer("task-1", None).await.unwrap();
        clock.advance(Duration::from_secs(300));
        remote.set_offline(true);
        session.stop_timer().await;
        let report = session.shutdown().await;
        assert_eq!(report.failed, vec![started.id.clone()]);
        started
    };
    assert_eq!(store.read_all(&namespace).await.unwrap().len(), 1);
    assert!(remote.entry(&started.id).await.unwrap().is_open());

    remote.set_offline(false);
    let session = open(&clock, &remote, &store).await;

    let on_remote = remote.entry(&started.id).await.unwrap();
    assert_eq!(on_remote.end_time, Some(T0 + 300_000));
    assert_eq!(on_remote.duration, Some(300));
    assert!(!session.is_running().await);
    assert_eq!(session.pending_count().await, 0);
    assert!(store.read_all(&namespace).await.unwrap().is_empty());
}

#[tokio::test]
async fn keeps_replayed_writes_queued_while_the_remote_is_still_down() {
    let clock = Arc::new(ManualClock::new(T0));
    let remote = Arc::new(InMemoryRemote::new(clock.clone()));
    let store = Arc::new(InMemoryKeyValueStore::new());

    {
        let session = open(&clock, &remote, &store).await;
        session.start_timer("task-1", None).await.unwrap();
        clock.advance(Duration::from_secs(60));
        remote.set_offline(true);
        session.stop_timer().await;
        session.shutdown().await;
    }

    let session = open(&clock, &remote, &store).await;
    assert_eq!(session.pending_count().await, 1);
    assert!(!session.is_running().await);

    remote.set_offline(false);
    assert!(session.flush().await.is_clean());
    assert_eq!(session.pending_count().await, 0);
}

#[tokio::test]
async fn replays_from_a_json_document_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let remote = Arc::new(InMemoryRemote::new(clock.clone()));
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let document = dir
        .path()
        .join(format!("{}.json", SessionConfig::default().pending_namespace));

    let started = {
        let session = open(&clock, &remote, &store).await;
        let started = session.start_timer("task-1", Some("deep work".into())).await.unwrap();
        clock.advance(Duration::from_secs(42));
        remote.set_offline(true);
        session.stop_timer().await;
        session.shutdown().await;
        started
    };
    assert!(document.exists());

    remote.set_offline(false);
    let reopened_store = Arc::new(JsonFileStore::new(dir.path()));
    let session = open(&clock, &remote, &reopened_store).await;

    assert_eq!(remote.entry(&started.id).await.unwrap().duration, Some(42));
    assert_eq!(session.pending_count().await, 0);
    assert!(!document.exists());
}

#[tokio::test]
async fn resumes_a_timer_left_running_by_an_earlier_session() {
    let clock = Arc::new(ManualClock::new(T0));
    let remote = Arc::new(InMemoryRemote::new(clock.clone()));
    let store = Arc::new(InMemoryKeyValueStore::new());

    let started = {
        let session = open(&clock, &remote, &store).await;
        session.start_timer("task-1", None).await.unwrap()
    };
    clock.advance(Duration::from_secs(3_723));

    let session = open(&clock, &remote, &store).await;
    assert_eq!(session.active_entry().await.unwrap().id, started.id);
    assert_eq!(session.elapsed_display().await.as_deref(), Some("01:02:03"));
}
