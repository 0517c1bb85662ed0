use crate::modules::time_entries::adapters::outbound::remote_in_memory::{InMemoryRemote, RemoteCall};
use crate::modules::time_entries::core::time_entry::TimeEntryPatch;
use crate::modules::time_entries::use_cases::track_time::config::SessionConfig;
use crate::modules::time_entries::use_cases::track_time::session::TimeTrackingSession;
use crate::shared::core::clock::ManualClock;
use crate::shared::infrastructure::durable_store::in_memory::InMemoryKeyValueStore;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

const USER: &str = "user-fixed-0001";

fn ten_o_clock() -> i64 {
    Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0)
        .single()
        .unwrap()
        .timestamp_millis()
}

async fn open_session(
    clock: &Arc<ManualClock>,
    remote: &Arc<InMemoryRemote>,
) -> TimeTrackingSession<InMemoryRemote, InMemoryKeyValueStore> {
    TimeTrackingSession::open(
        USER,
        remote.clone(),
        Arc::new(InMemoryKeyValueStore::new()),
        clock.clone(),
        SessionConfig::default(),
    )
    .await
    .unwrap()
}

fn setup() -> (Arc<ManualClock>, Arc<InMemoryRemote>) {
    let clock = Arc::new(ManualClock::new(ten_o_clock()));
    let remote = Arc::new(InMemoryRemote::new(clock.clone()));
    (clock, remote)
}

#[tokio::test]
async fn tracks_ninety_seconds_of_work() {
    let (clock, remote) = setup();
    let session = open_session(&clock, &remote).await;

    let started = session.start_timer("task-1", None).await.unwrap();
    clock.advance(Duration::from_secs(90));
    assert_eq!(session.elapsed_display().await.as_deref(), Some("00:01:30"));

    let stopped = session.stop_timer().await.unwrap();
    assert_eq!(stopped.end_time, Some(ten_o_clock() + 90_000));
    assert_eq!(stopped.duration, Some(90));

    session.flush().await;
    let on_remote = remote.entry(&started.id).await.unwrap();
    assert_eq!(on_remote.end_time, Some(ten_o_clock() + 90_000));
    assert_eq!(on_remote.duration, Some(90));
}

#[tokio::test]
async fn switching_tasks_closes_the_previous_entry_at_the_same_instant() {
    let (clock, remote) = setup();
    let session = open_session(&clock, &remote).await;

    let first = session.start_timer("task-1", None).await.unwrap();
    clock.advance(Duration::from_secs(600));
    let second = session.start_timer("task-2", None).await.unwrap();

    let local = session.local_entries().await;
    assert_eq!(local.iter().filter(|entry| entry.is_open()).count(), 1);
    let closed = local.iter().find(|entry| entry.id == first.id).unwrap();
    assert_eq!(closed.end_time, Some(second.start_time));
    assert_eq!(closed.duration, Some(600));
    assert_eq!(session.active_entry().await.unwrap().task_ref, "task-2");

    session.flush().await;
    let open_remotely: Vec<_> = remote
        .entries()
        .await
        .into_iter()
        .filter(|entry| entry.is_open())
        .collect();
    assert_eq!(open_remotely.len(), 1);
    assert_eq!(open_remotely[0].id, second.id);
}

#[tokio::test]
async fn stopping_twice_sends_one_close() {
    let (clock, remote) = setup();
    let session = open_session(&clock, &remote).await;

    session.start_timer("task-1", None).await.unwrap();
    clock.advance(Duration::from_secs(30));
    assert!(session.stop_timer().await.is_some());
    assert!(session.stop_timer().await.is_none());

    session.flush().await;
    assert_eq!(remote.update_calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn edits_within_the_debounce_window_reach_the_remote_as_one_update() {
    let (clock, remote) = setup();
    let session = open_session(&clock, &remote).await;

    let started = session.start_timer("task-1", None).await.unwrap();
    clock.advance(Duration::from_secs(45));
    session.stop_timer().await;
    session
        .update_entry(&started.id, TimeEntryPatch::description("pairing"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let updates = remote.update_calls().await;
    assert_eq!(updates.len(), 1);
    let (id, patch) = &updates[0];
    assert_eq!(id, &started.id);
    assert_eq!(patch.end_time, Some(ten_o_clock() + 45_000));
    assert_eq!(patch.duration, Some(45));
    assert_eq!(patch.description.as_deref(), Some("pairing"));
    assert_eq!(session.pending_count().await, 0);
}

#[tokio::test]
async fn summaries_refresh_once_a_close_is_confirmed() {
    let (clock, remote) = setup();
    let session = open_session(&clock, &remote).await;

    assert_eq!(session.get_task_summary("task-1").await.unwrap(), None);

    session.start_timer("task-1", None).await.unwrap();
    clock.advance(Duration::from_secs(120));
    session.stop_timer().await;
    session.flush().await;

    let summary = session.get_task_summary("task-1").await.unwrap().unwrap();
    assert_eq!(summary.total_duration, 120);
    assert_eq!(summary.unique_contributors, 1);
    let summary_reads = remote
        .calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, RemoteCall::TaskSummary { .. }))
        .count();
    assert_eq!(summary_reads, 2);
}

#[tokio::test]
async fn a_failed_start_leaves_the_previous_entry_closed() {
    let (clock, remote) = setup();
    let session = open_session(&clock, &remote).await;

    let first = session.start_timer("task-1", None).await.unwrap();
    clock.advance(Duration::from_secs(60));
    remote.set_offline(true);

    assert!(session.start_timer("task-2", None).await.is_err());
    assert!(!session.is_running().await);

    remote.set_offline(false);
    session.flush().await;
    assert_eq!(remote.entry(&first.id).await.unwrap().duration, Some(60));
    assert_eq!(remote.entries().await.len(), 1);
}

#[tokio::test]
async fn other_users_entries_are_read_but_not_adopted() {
    let (clock, remote) = setup();
    let session = open_session(&clock, &remote).await;
    remote
        .seed(
            crate::tests::fixtures::time_entry::TimeEntryBuilder::new()
                .id("te-other")
                .user_ref("user-other")
                .build(),
        )
        .await;

    let theirs = session.get_user_time_entries(Some("user-other")).await.unwrap();

    assert_eq!(theirs.len(), 1);
    assert!(session.local_entries().await.is_empty());
}
