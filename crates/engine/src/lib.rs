//! 保鲜调度引擎
//!
//! 核心职责：任务注册与年龄窗口合并、启动同步屏障、单任务执行
//! 状态机、到期任务的轮询派发。存储与观测通过抽象接口注入。

pub mod barrier;
pub mod engine;
mod executor;
pub mod poll;
pub mod registry;

pub use barrier::StartupBarrier;
pub use engine::FreshnessEngine;
pub use poll::PollHandle;
pub use registry::reconcile_record;
