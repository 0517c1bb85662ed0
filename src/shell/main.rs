use time_sessions::modules::time_entries::core::time_entry::TimeEntryPatch;
use time_sessions::modules::time_entries::use_cases::track_time::config::SessionConfig;
use time_sessions::shell::open_local_session;
use tracing_subscriber::{EnvFilter, fmt};

const DEMO_USER: &str = "demo-user";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = SessionConfig::from_env()?;
    let tick_interval = config.tick_interval;
    let (session, _remote) = open_local_session(DEMO_USER, config).await?;

    let mut elapsed = session.watch_elapsed();
    let first = session
        .start_timer("task-design", Some("sketching the flow".into()))
        .await?;
    for _ in 0..3 {
        elapsed.changed().await?;
        let current = *elapsed.borrow();
        if let Some(seconds) = current {
            tracing::info!(entry_id = %first.id, elapsed = seconds, "tick");
        }
    }

    let second = session.start_timer("task-review", None).await?;
    tokio::time::sleep(tick_interval * 2).await;
    session
        .update_entry(&second.id, TimeEntryPatch::description("reviewing the draft"))
        .await?;
    if let Some(stopped) = session.stop_timer().await {
        tracing::info!(entry_id = %stopped.id, duration = ?stopped.duration, "stopped");
    }

    let report = session.shutdown().await;
    for task in ["task-design", "task-review"] {
        let summary = session.get_task_summary(task).await?;
        tracing::info!(task, ?summary, "task summary");
    }
    let mine = session.get_user_time_entries(None).await?;
    tracing::info!(entries = mine.len(), pending = report.failed.len(), "done");
    Ok(())
}
