//! 任务存储抽象
//!
//! 定义文档式存储的数据访问接口，遵循依赖倒置原则。
//! 引擎只消费四个操作：insert、find、find_one、update（含upsert）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use freshd_core::FreshdResult;

use crate::entities::{LastRunStatus, TaskRecord, TaskStatus};

/// 记录查询条件，各条件之间为 AND 关系
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// 精确匹配id
    pub id: Option<String>,
    /// next 早于该时刻（`$lt` 语义）
    pub next_before: Option<DateTime<Utc>>,
    /// 状态不等于该值（`$ne` 语义）
    pub status_not: Option<TaskStatus>,
}

impl RecordQuery {
    pub fn by_id<S: Into<String>>(id: S) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// 到期且未在运行的记录：`next < now AND status != running`
    pub fn due_at(now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            next_before: Some(now),
            status_not: Some(TaskStatus::Running),
        }
    }

    /// 纯函数形式的匹配判断，内存实现与测试共用
    pub fn matches(&self, record: &TaskRecord) -> bool {
        if let Some(id) = &self.id {
            if &record.id != id {
                return false;
            }
        }
        if let Some(before) = self.next_before {
            if record.next >= before {
                return false;
            }
        }
        if let Some(excluded) = self.status_not {
            if record.status == excluded {
                return false;
            }
        }
        true
    }
}

/// 字段更新操作，区分"设值"、"置空"和"不变"
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UpdateValue<T> {
    Set(T),
    Unset,
    #[default]
    NoChange,
}

impl<T> UpdateValue<T> {
    pub fn is_change(&self) -> bool {
        !matches!(self, UpdateValue::NoChange)
    }

    /// 应用到现有值上
    pub fn apply_to(self, existing: Option<T>) -> Option<T> {
        match self {
            UpdateValue::Set(value) => Some(value),
            UpdateValue::Unset => None,
            UpdateValue::NoChange => existing,
        }
    }
}

/// 记录补丁，"设置这些字段"语义，未提及的字段保持原值
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub min_age_ms: Option<i64>,
    pub max_age_ms: Option<i64>,
    pub status: Option<TaskStatus>,
    pub last: UpdateValue<DateTime<Utc>>,
    pub last_status: Option<LastRunStatus>,
    pub last_error: UpdateValue<String>,
    pub last_end: UpdateValue<DateTime<Utc>>,
    pub last_elapsed: UpdateValue<String>,
    pub last_result: UpdateValue<serde_json::Value>,
    pub next: Option<DateTime<Utc>>,
}

impl RecordPatch {
    /// 将补丁应用到记录上，内存实现与upsert共用
    pub fn apply(&self, record: &mut TaskRecord) {
        if let Some(v) = self.min_age_ms {
            record.min_age_ms = v;
        }
        if let Some(v) = self.max_age_ms {
            record.max_age_ms = v;
        }
        if let Some(v) = self.status {
            record.status = v;
        }
        record.last = self.last.clone().apply_to(record.last.take());
        if let Some(v) = self.last_status {
            record.last_status = v;
        }
        record.last_error = self.last_error.clone().apply_to(record.last_error.take());
        record.last_end = self.last_end.clone().apply_to(record.last_end.take());
        record.last_elapsed = self
            .last_elapsed
            .clone()
            .apply_to(record.last_elapsed.take());
        record.last_result = self
            .last_result
            .clone()
            .apply_to(record.last_result.take());
        if let Some(v) = self.next {
            record.next = v;
        }
    }

    /// 覆盖记录全部字段的补丁，注册时的upsert使用
    pub fn from_record(record: &TaskRecord) -> Self {
        fn set_or_unset<T: Clone>(value: &Option<T>) -> UpdateValue<T> {
            match value {
                Some(v) => UpdateValue::Set(v.clone()),
                None => UpdateValue::Unset,
            }
        }

        Self {
            min_age_ms: Some(record.min_age_ms),
            max_age_ms: Some(record.max_age_ms),
            status: Some(record.status),
            last: set_or_unset(&record.last),
            last_status: Some(record.last_status),
            last_error: set_or_unset(&record.last_error),
            last_end: set_or_unset(&record.last_end),
            last_elapsed: set_or_unset(&record.last_elapsed),
            last_result: set_or_unset(&record.last_result),
            next: Some(record.next),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// 无匹配记录时是否创建
    pub upsert: bool,
}

/// 任务记录存储抽象
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, record: &TaskRecord) -> FreshdResult<TaskRecord>;

    /// 查询匹配的记录，无匹配时返回空集而不报错
    async fn find(&self, query: &RecordQuery) -> FreshdResult<Vec<TaskRecord>>;

    /// 查询单条记录，不存在时返回 `TaskNotFound`
    async fn find_one(&self, query: &RecordQuery) -> FreshdResult<TaskRecord>;

    /// 按补丁更新匹配记录，返回受影响的条数
    ///
    /// `upsert` 开启且无匹配时，以查询中的id为主键创建记录并应用补丁。
    async fn update(
        &self,
        query: &RecordQuery,
        patch: &RecordPatch,
        options: UpdateOptions,
    ) -> FreshdResult<u64>;
}
