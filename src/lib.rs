//! freshd：基于任务年龄的持久化保鲜调度系统
//!
//! 每个任务声明一个可接受的"陈旧窗口"（距上次运行的最小/最大年龄），
//! 引擎保证任务一旦超出窗口就会被再次执行，并把运行历史持久化，
//! 调度状态在进程重启后继续生效。

pub mod app;

pub use app::FreshdApp;
pub use freshd_core::{init_logging, AppConfig, FreshdError, FreshdResult};
pub use freshd_domain::{
    AgeWindow, EventBus, EventEnvelope, FnHandler, LastRunStatus, RecordPatch, RecordQuery,
    TaskContext, TaskEvent, TaskHandler, TaskRecord, TaskStatus, TaskStore, UpdateOptions,
    UpdateValue,
};
pub use freshd_engine::{FreshnessEngine, PollHandle};
pub use freshd_infrastructure::{provision_storage, sqlite_url, SqliteTaskStore};
