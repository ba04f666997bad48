//! 任务处理逻辑抽象

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::entities::TaskRecord;

/// 传递给处理逻辑的执行上下文
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub id: String,
    /// 本次运行开始前的任务记录
    pub task: TaskRecord,
}

/// 任务处理逻辑
///
/// 返回值作为成功结果持久化；错误被捕获记录，不会向上传播。
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<Value>;
}

/// 闭包形式的处理逻辑适配器
pub struct FnHandler<F>(F);

impl<F> FnHandler<F>
where
    F: Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> TaskHandler for FnHandler<F>
where
    F: Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync,
{
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<Value> {
        (self.0)(ctx).await
    }
}
