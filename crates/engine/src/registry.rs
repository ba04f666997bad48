//! 任务注册与记录合并

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use freshd_core::FreshdResult;
use freshd_domain::{
    AgeWindow, LastRunStatus, RecordPatch, RecordQuery, TaskEvent, TaskRecord, TaskStatus,
    UpdateOptions,
};

use crate::engine::EngineInner;

/// 执行一次注册的异步部分：解析窗口、与持久化记录合并、落库、发事件
pub(crate) async fn register_task(
    inner: &EngineInner,
    id: &str,
    window_spec: &str,
) -> FreshdResult<TaskRecord> {
    let window = AgeWindow::parse(window_spec)?;

    let persisted = inner
        .store
        .find(&RecordQuery::by_id(id))
        .await?
        .into_iter()
        .next();

    let was_interrupted = persisted
        .as_ref()
        .map(|prev| prev.is_running() && prev.last.is_some())
        .unwrap_or(false);
    if was_interrupted {
        warn!("任务 {} 上次运行未正常结束，标记为中断", id);
    }

    let now = Utc::now();
    let first_probe = now + Duration::milliseconds(first_probe_jitter_ms(&window));
    let merged = reconcile_record(id, &window, persisted, first_probe);

    inner
        .store
        .update(
            &RecordQuery::by_id(id),
            &RecordPatch::from_record(&merged),
            UpdateOptions { upsert: true },
        )
        .await?;

    info!("任务注册完成: {}", merged.entity_description());
    inner.events.emit(TaskEvent::Registered {
        record: merged.clone(),
    });

    Ok(merged)
}

/// 首次探测时刻的随机偏移，避免同时注册的大量任务在同一时刻集中触发
fn first_probe_jitter_ms(window: &AgeWindow) -> i64 {
    let span = window.jitter_span_ms();
    if span <= 0 {
        0
    } else {
        rand::rng().random_range(0..=span)
    }
}

/// 声明的注册信息与持久化记录的逐字段合并
///
/// 优先级：窗口字段总是取声明值；历史字段（last、last_status、last_error、
/// last_end、last_elapsed、last_result、next）有持久化值时保留；否则取默认。
/// 持久化状态为 running 且存在运行历史时，说明上一进程在运行中终止，
/// 将 last_status 改写为中断标签。status 一律重置为 waiting。
pub fn reconcile_record(
    id: &str,
    window: &AgeWindow,
    persisted: Option<TaskRecord>,
    first_probe: DateTime<Utc>,
) -> TaskRecord {
    match persisted {
        None => TaskRecord::new(
            id.to_string(),
            window.min_age_ms,
            window.max_age_ms,
            first_probe,
        ),
        Some(prev) => {
            let interrupted = prev.is_running() && prev.last.is_some();
            TaskRecord {
                id: id.to_string(),
                min_age_ms: window.min_age_ms,
                max_age_ms: window.max_age_ms,
                status: TaskStatus::Waiting,
                last: prev.last,
                last_status: if interrupted {
                    LastRunStatus::Interrupted
                } else {
                    prev.last_status
                },
                last_error: prev.last_error,
                last_end: prev.last_end,
                last_elapsed: prev.last_elapsed,
                last_result: prev.last_result,
                next: prev.next,
            }
        }
    }
}
