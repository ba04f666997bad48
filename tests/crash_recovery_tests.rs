use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use freshd::{AppConfig, FreshdApp, LastRunStatus, TaskStatus};
use freshd_testing_utils::CountingHandler;

fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.path = dir
        .path()
        .join("freshd.db")
        .to_str()
        .unwrap()
        .to_string();
    config
}

/// 模拟进程在任务运行中途被终止后重启：
/// 第一个应用实例正常注册并留下running状态的记录，
/// 第二个实例在同一个数据库上重新注册时必须识别出中断。
#[tokio::test]
async fn test_restart_marks_interrupted_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let started_at = Utc::now() - Duration::minutes(2);
    {
        use freshd::{RecordPatch, RecordQuery, TaskStore, UpdateOptions, UpdateValue};

        let app = FreshdApp::new(config.clone()).await.unwrap();
        app.schedule("report", "10min", Arc::new(CountingHandler::new()))
            .await
            .unwrap();
        app.report().await.unwrap();

        // 把记录改写成运行中，模拟没有来得及写入完成状态的进程退出
        let store = freshd::SqliteTaskStore::new_embedded(
            &freshd::sqlite_url(&config.storage.path),
            2,
            1,
        )
        .await
        .unwrap();
        store
            .update(
                &RecordQuery::by_id("report"),
                &RecordPatch {
                    status: Some(TaskStatus::Running),
                    last: UpdateValue::Set(started_at),
                    last_end: UpdateValue::Unset,
                    ..Default::default()
                },
                UpdateOptions::default(),
            )
            .await
            .unwrap();
    }

    // "重启"：新的应用实例使用同一个数据库文件
    let app = FreshdApp::new(config).await.unwrap();
    app.schedule("report", "10min", Arc::new(CountingHandler::new()))
        .await
        .unwrap();

    let records = app.report().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, TaskStatus::Waiting);
    assert_eq!(record.last_status, LastRunStatus::Interrupted);
    assert_eq!(record.last, Some(started_at));
}

/// 重启后历史与next保留，窗口取新声明的值
#[tokio::test]
async fn test_restart_preserves_history_and_next() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let first_next;
    {
        let app = FreshdApp::new(config.clone()).await.unwrap();
        let handler = Arc::new(CountingHandler::with_result(serde_json::json!(7)));
        app.schedule("tally", "1h", handler).await.unwrap();
        app.run("tally").await.unwrap();
        first_next = app.report().await.unwrap()[0].next;
    }

    let app = FreshdApp::new(config).await.unwrap();
    app.schedule("tally", "2h", Arc::new(CountingHandler::new()))
        .await
        .unwrap();

    let records = app.report().await.unwrap();
    let record = &records[0];
    assert_eq!(record.min_age_ms, 2 * 60 * 60 * 1000);
    assert_eq!(record.last_status, LastRunStatus::Success);
    assert_eq!(record.last_result, Some(serde_json::json!(7)));
    assert_eq!(record.next, first_next);
}
