use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 持久化的任务记录，每个任务id对应一条
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    /// 年龄窗口下界（毫秒）
    pub min_age_ms: i64,
    /// 年龄窗口上界（毫秒）
    pub max_age_ms: i64,
    pub status: TaskStatus, // waiting, running
    /// 最近一次运行的开始时间
    pub last: Option<DateTime<Utc>>,
    pub last_status: LastRunStatus,
    /// 失败详情，last_status为error时有值
    pub last_error: Option<String>,
    /// 最近一次运行的结束时间
    pub last_end: Option<DateTime<Utc>>,
    /// 人类可读的运行耗时
    pub last_elapsed: Option<String>,
    /// 成功结果，在存储边界序列化
    pub last_result: Option<serde_json::Value>,
    /// 下一次允许执行的最早时间
    pub next: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "waiting")]
    Waiting,
    #[serde(rename = "running")]
    Running,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Running => "running",
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaskStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        match s {
            "waiting" => Ok(TaskStatus::Waiting),
            "running" => Ok(TaskStatus::Running),
            _ => Err(format!("Invalid task status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

/// 最近一次运行的结果标签
///
/// 序列化形式与存储中的取值一致，包括两个句子形式的历史标签。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LastRunStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "no prior run information")]
    NeverRun,
    #[serde(rename = "interrupted by program execution ending")]
    Interrupted,
}

impl LastRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LastRunStatus::Success => "success",
            LastRunStatus::Error => "error",
            LastRunStatus::NeverRun => "no prior run information",
            LastRunStatus::Interrupted => "interrupted by program execution ending",
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for LastRunStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for LastRunStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        match s {
            "success" => Ok(LastRunStatus::Success),
            "error" => Ok(LastRunStatus::Error),
            "no prior run information" => Ok(LastRunStatus::NeverRun),
            "interrupted by program execution ending" => Ok(LastRunStatus::Interrupted),
            _ => Err(format!("Invalid last run status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for LastRunStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

impl TaskRecord {
    /// 创建一条从未运行过的新记录
    pub fn new(id: String, min_age_ms: i64, max_age_ms: i64, next: DateTime<Utc>) -> Self {
        Self {
            id,
            min_age_ms,
            max_age_ms,
            status: TaskStatus::Waiting,
            last: None,
            last_status: LastRunStatus::NeverRun,
            last_error: None,
            last_end: None,
            last_elapsed: None,
            last_result: None,
            next,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, TaskStatus::Running)
    }

    /// 记录在指定时刻是否已到期
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next < now && !self.is_running()
    }

    pub fn entity_description(&self) -> String {
        format!(
            "任务 '{}' (窗口: {}ms-{}ms, 状态: {})",
            self.id,
            self.min_age_ms,
            self.max_age_ms,
            self.status.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_record_defaults() {
        let now = Utc::now();
        let record = TaskRecord::new("cleanup".to_string(), 1000, 2000, now);
        assert_eq!(record.status, TaskStatus::Waiting);
        assert_eq!(record.last_status, LastRunStatus::NeverRun);
        assert!(record.last.is_none());
        assert!(record.last_result.is_none());
        assert_eq!(record.next, now);
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let mut record = TaskRecord::new("t".to_string(), 0, 0, now - Duration::seconds(1));
        assert!(record.is_due(now));

        record.status = TaskStatus::Running;
        assert!(!record.is_due(now));

        record.status = TaskStatus::Waiting;
        record.next = now + Duration::seconds(1);
        assert!(!record.is_due(now));
    }

    #[test]
    fn test_last_run_status_labels() {
        assert_eq!(LastRunStatus::NeverRun.as_str(), "no prior run information");
        assert_eq!(
            LastRunStatus::Interrupted.as_str(),
            "interrupted by program execution ending"
        );
        let json = serde_json::to_string(&LastRunStatus::Interrupted).unwrap();
        assert_eq!(json, "\"interrupted by program execution ending\"");
    }
}
