//! 单任务执行状态机

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};

use freshd_domain::{
    human_duration, LastRunStatus, RecordPatch, RecordQuery, TaskContext, TaskEvent, TaskRecord,
    TaskStatus, UpdateOptions, UpdateValue,
};

use crate::engine::EngineInner;

/// 执行一次指定任务
///
/// 所有失败路径都以事件或日志收尾，不向调用方抛出。
/// 启动屏障由调用方（手动触发入口或轮询）先行等待。
pub(crate) async fn run_task(inner: Arc<EngineInner>, id: &str) {
    inner.events.emit(TaskEvent::WillStart { id: id.to_string() });

    let by_id = RecordQuery::by_id(id);
    let record = match inner.store.find_one(&by_id).await {
        Ok(record) => record,
        Err(e) => {
            warn!("加载任务 {} 的记录失败: {}", id, e);
            inner.events.emit(TaskEvent::FindError {
                id: id.to_string(),
                error: e.to_string(),
            });
            return;
        }
    };

    // 防重入保护：status为running的记录不再进入
    if record.is_running() {
        debug!("任务 {} 已在运行，取消本次触发", id);
        inner.events.emit(TaskEvent::Cancelled {
            record,
            reason: "Already Running".to_string(),
        });
        return;
    }

    let handler = inner.handlers.read().await.get(id).cloned();
    let Some(handler) = handler else {
        warn!("任务 {} 没有绑定处理逻辑，取消执行", id);
        inner.events.emit(TaskEvent::Cancelled {
            record,
            reason: "No Handler Bound".to_string(),
        });
        return;
    };

    inner.events.emit(TaskEvent::Started {
        record: record.clone(),
    });
    let start = Utc::now();

    let claim = RecordPatch {
        status: Some(TaskStatus::Running),
        last: UpdateValue::Set(start),
        last_end: UpdateValue::Unset,
        ..Default::default()
    };
    if let Err(e) = inner
        .store
        .update(&by_id, &claim, UpdateOptions::default())
        .await
    {
        error!("标记任务 {} 为运行中失败: {}", id, e);
        return;
    }
    // 重新加载，吸收可能交错发生的外部写入
    let record = match inner.store.find_one(&by_id).await {
        Ok(record) => record,
        Err(e) => {
            error!("重新加载任务 {} 的记录失败: {}", id, e);
            return;
        }
    };

    // 每次运行重新取抖动，避免多次运行相位锁定
    let delay_ms = compute_delay_ms(&record);

    let ctx = TaskContext {
        id: id.to_string(),
        task: record,
    };
    let outcome = handler.run(ctx).await;

    let end = Utc::now();
    let elapsed = human_duration((end - start).num_milliseconds());
    // 从完成时刻起算，慢任务不会压缩下一个窗口
    let next = end + Duration::milliseconds(delay_ms);

    let (patch, error_detail) = match outcome {
        Ok(result) => (
            RecordPatch {
                status: Some(TaskStatus::Waiting),
                last_status: Some(LastRunStatus::Success),
                last_error: UpdateValue::Unset,
                last_end: UpdateValue::Set(end),
                last_elapsed: UpdateValue::Set(elapsed.clone()),
                last_result: UpdateValue::Set(result),
                next: Some(next),
                ..Default::default()
            },
            None,
        ),
        Err(err) => {
            let detail = format!("{err:?}");
            error!("任务 {} 执行失败: {:#}", id, err);
            (
                RecordPatch {
                    status: Some(TaskStatus::Waiting),
                    last_status: Some(LastRunStatus::Error),
                    last_error: UpdateValue::Set(detail.clone()),
                    last_end: UpdateValue::Set(end),
                    last_elapsed: UpdateValue::Set(elapsed.clone()),
                    last_result: UpdateValue::Unset,
                    next: Some(next),
                    ..Default::default()
                },
                Some(detail),
            )
        }
    };

    if let Err(e) = inner
        .store
        .update(&by_id, &patch, UpdateOptions::default())
        .await
    {
        error!("记录任务 {} 的执行结果失败: {}", id, e);
        return;
    }
    let record = match inner.store.find_one(&by_id).await {
        Ok(record) => record,
        Err(e) => {
            error!("重新加载任务 {} 的执行结果失败: {}", id, e);
            return;
        }
    };

    match error_detail {
        None => {
            info!("任务 {} 执行成功，耗时 {}", id, elapsed);
            inner.events.emit(TaskEvent::Succeeded {
                record: record.clone(),
            });
        }
        Some(error) => {
            inner.events.emit(TaskEvent::Failed {
                record: record.clone(),
                error,
            });
        }
    }

    inner.events.emit(TaskEvent::Ended {
        id: id.to_string(),
        record,
    });
}

/// 下一次触发的延迟：精确窗口取下界，否则在窗口宽度内均匀取随机值
fn compute_delay_ms(record: &TaskRecord) -> i64 {
    let span = record.max_age_ms - record.min_age_ms;
    if span <= 0 {
        record.min_age_ms
    } else {
        rand::rng().random_range(0..=span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_exact_window_uses_min_age() {
        let record = TaskRecord::new("t".to_string(), 5000, 5000, Utc::now());
        assert_eq!(compute_delay_ms(&record), 5000);
    }

    #[test]
    fn test_delay_jitter_within_span() {
        let record = TaskRecord::new("t".to_string(), 1000, 4000, Utc::now());
        for _ in 0..200 {
            let delay = compute_delay_ms(&record);
            assert!((0..=3000).contains(&delay));
        }
    }
}
