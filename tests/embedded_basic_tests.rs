use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use freshd::{AppConfig, FreshdApp, LastRunStatus, TaskStatus};
use freshd_testing_utils::{CountingHandler, FailingHandler};

fn test_config(dir: &TempDir, cooldown: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.path = dir
        .path()
        .join("freshd.db")
        .to_str()
        .unwrap()
        .to_string();
    config.engine.cooldown = cooldown.to_string();
    config
}

#[tokio::test]
async fn test_app_register_run_and_report() {
    let dir = TempDir::new().unwrap();
    let app = FreshdApp::new(test_config(&dir, "60s")).await.unwrap();

    let handler = Arc::new(CountingHandler::with_result(serde_json::json!("done")));
    app.schedule("heartbeat", "5min", handler.clone())
        .await
        .unwrap();

    app.run("heartbeat").await.unwrap();
    assert_eq!(handler.run_count(), 1);

    let records = app.report().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, "heartbeat");
    assert_eq!(record.status, TaskStatus::Waiting);
    assert_eq!(record.last_status, LastRunStatus::Success);
    assert_eq!(record.last_result, Some(serde_json::json!("done")));
    assert!(record.last_elapsed.is_some());
}

#[tokio::test]
async fn test_app_poll_loop_executes_due_tasks() {
    let dir = TempDir::new().unwrap();
    let app = FreshdApp::new(test_config(&dir, "50ms")).await.unwrap();

    let handler = Arc::new(CountingHandler::new());
    app.schedule("refresh", "0s", handler.clone())
        .await
        .unwrap();

    let poll = app.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    poll.stop().await;

    assert!(handler.run_count() >= 1, "轮询应触发到期任务");
}

#[tokio::test]
async fn test_app_records_handler_failure() {
    let dir = TempDir::new().unwrap();
    let app = FreshdApp::new(test_config(&dir, "60s")).await.unwrap();

    app.schedule("sync", "10min", Arc::new(FailingHandler::new("network down")))
        .await
        .unwrap();

    app.run("sync").await.unwrap();

    let records = app.report().await.unwrap();
    assert_eq!(records[0].last_status, LastRunStatus::Error);
    assert!(records[0]
        .last_error
        .as_deref()
        .unwrap()
        .contains("network down"));
    assert_eq!(records[0].last_result, None);
}

#[tokio::test]
async fn test_app_start_fails_on_bad_window() {
    let dir = TempDir::new().unwrap();
    let app = FreshdApp::new(test_config(&dir, "60s")).await.unwrap();

    app.schedule("broken", "whenever", Arc::new(CountingHandler::new()))
        .await
        .unwrap();

    assert!(app.start().await.is_err());
}

#[tokio::test]
async fn test_app_rejects_empty_storage_path() {
    let mut config = AppConfig::default();
    config.storage.path = String::new();
    assert!(FreshdApp::new(config).await.is_err());
}
