//! 任务生命周期事件
//!
//! 供外部观测方订阅，引擎只负责发布，不关心是否有订阅者。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::entities::TaskRecord;

/// 任务事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEvent {
    Registered {
        record: TaskRecord,
    },
    WillStart {
        id: String,
    },
    FindError {
        id: String,
        error: String,
    },
    Cancelled {
        record: TaskRecord,
        reason: String,
    },
    Started {
        record: TaskRecord,
    },
    Succeeded {
        record: TaskRecord,
    },
    Failed {
        record: TaskRecord,
        error: String,
    },
    Ended {
        id: String,
        record: TaskRecord,
    },
}

impl TaskEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::Registered { .. } => "task-registered",
            TaskEvent::WillStart { .. } => "task-will-start",
            TaskEvent::FindError { .. } => "task-find-error",
            TaskEvent::Cancelled { .. } => "task-cancelled",
            TaskEvent::Started { .. } => "task-start",
            TaskEvent::Succeeded { .. } => "task-success",
            TaskEvent::Failed { .. } => "task-error",
            TaskEvent::Ended { .. } => "task-end",
        }
    }

    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Registered { record }
            | TaskEvent::Cancelled { record, .. }
            | TaskEvent::Started { record }
            | TaskEvent::Succeeded { record }
            | TaskEvent::Failed { record, .. } => &record.id,
            TaskEvent::WillStart { id }
            | TaskEvent::FindError { id, .. }
            | TaskEvent::Ended { id, .. } => id,
        }
    }
}

/// 事件信封，附带事件标识和发生时间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event: TaskEvent,
}

/// 基于广播通道的事件总线
///
/// 没有订阅者或订阅者落后时发布不会失败也不会阻塞。
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: TaskEvent) {
        debug!(
            "发布任务事件: {} (任务: {})",
            event.event_type(),
            event.task_id()
        );
        let envelope = EventEnvelope {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event,
        };
        // 无订阅者时send返回Err，属正常情况
        let _ = self.sender.send(envelope);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TaskRecord;

    fn sample_record() -> TaskRecord {
        TaskRecord::new("sync".to_string(), 0, 1000, Utc::now())
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(TaskEvent::WillStart {
            id: "sync".to_string(),
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event.event_type(), "task-will-start");
        assert_eq!(envelope.event.task_id(), "sync");
    }

    #[tokio::test]
    async fn test_emit_without_subscriber_is_silent() {
        let bus = EventBus::new(16);
        bus.emit(TaskEvent::Registered {
            record: sample_record(),
        });
    }

    #[test]
    fn test_event_type_labels() {
        let record = sample_record();
        assert_eq!(
            TaskEvent::Failed {
                record: record.clone(),
                error: "x".to_string()
            }
            .event_type(),
            "task-error"
        );
        assert_eq!(
            TaskEvent::Ended {
                id: record.id.clone(),
                record
            }
            .event_type(),
            "task-end"
        );
    }
}
