//! Test data builders

use chrono::{DateTime, Utc};

use freshd_domain::{LastRunStatus, TaskRecord, TaskStatus};

/// Fluent builder for `TaskRecord` test fixtures
#[derive(Debug, Clone)]
pub struct TaskRecordBuilder {
    record: TaskRecord,
}

impl TaskRecordBuilder {
    pub fn new() -> Self {
        Self {
            record: TaskRecord::new("test_task".to_string(), 0, 0, Utc::now()),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.record.id = id.to_string();
        self
    }

    pub fn with_window(mut self, min_age_ms: i64, max_age_ms: i64) -> Self {
        self.record.min_age_ms = min_age_ms;
        self.record.max_age_ms = max_age_ms;
        self
    }

    pub fn running(mut self) -> Self {
        self.record.status = TaskStatus::Running;
        self
    }

    pub fn with_last(mut self, last: DateTime<Utc>) -> Self {
        self.record.last = Some(last);
        self
    }

    pub fn with_last_status(mut self, status: LastRunStatus) -> Self {
        self.record.last_status = status;
        self
    }

    pub fn with_last_error(mut self, error: &str) -> Self {
        self.record.last_error = Some(error.to_string());
        self
    }

    pub fn with_last_result(mut self, result: serde_json::Value) -> Self {
        self.record.last_result = Some(result);
        self
    }

    pub fn with_next(mut self, next: DateTime<Utc>) -> Self {
        self.record.next = next;
        self
    }

    pub fn build(self) -> TaskRecord {
        self.record
    }
}

impl Default for TaskRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}
