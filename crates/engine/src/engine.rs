//! 保鲜调度引擎
//!
//! 显式的引擎对象，持有处理逻辑绑定表、事件总线与启动屏障，
//! 不依赖任何进程级单例。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, warn};

use freshd_core::{FreshdError, FreshdResult};
use freshd_domain::{EventBus, EventEnvelope, RecordQuery, TaskHandler, TaskRecord, TaskStore};

use crate::barrier::StartupBarrier;
use crate::executor;
use crate::poll::{self, PollHandle};
use crate::registry;

pub(crate) struct EngineInner {
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) events: EventBus,
    /// 处理逻辑绑定表，每个id只写入一次
    pub(crate) handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
    pub(crate) barrier: StartupBarrier,
    pub(crate) cooldown: Duration,
}

#[derive(Clone)]
pub struct FreshnessEngine {
    inner: Arc<EngineInner>,
}

impl FreshnessEngine {
    pub fn new(store: Arc<dyn TaskStore>, cooldown: Duration) -> Self {
        Self::with_event_capacity(store, cooldown, 256)
    }

    pub fn with_event_capacity(
        store: Arc<dyn TaskStore>,
        cooldown: Duration,
        event_capacity: usize,
    ) -> Self {
        let cooldown = if cooldown.is_zero() {
            warn!("冷却间隔为0，改用1ms");
            Duration::from_millis(1)
        } else {
            cooldown
        };
        Self {
            inner: Arc::new(EngineInner {
                store,
                events: EventBus::new(event_capacity),
                handlers: RwLock::new(HashMap::new()),
                barrier: StartupBarrier::new(),
                cooldown,
            }),
        }
    }

    /// 订阅任务生命周期事件
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.inner.events.subscribe()
    }

    /// 注册一个任务
    ///
    /// 同步部分绑定处理逻辑并校验id唯一；窗口解析与存储合并作为
    /// 独立的异步注册任务执行，其完成情况由启动屏障统一收口。
    /// 同一id注册两次是致命的配置错误，且不会覆盖首次的绑定。
    pub async fn schedule(
        &self,
        id: &str,
        window_spec: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> FreshdResult<()> {
        if self.inner.barrier.is_sealed() {
            return Err(FreshdError::config_error(format!(
                "启动屏障已封存，任务 {id} 必须在首次执行前注册"
            )));
        }

        {
            let mut handlers = self.inner.handlers.write().await;
            if handlers.contains_key(id) {
                error!("任务 {} 重复定义", id);
                return Err(FreshdError::task_already_defined(id));
            }
            handlers.insert(id.to_string(), handler);
        }

        let inner = Arc::clone(&self.inner);
        let task_id = id.to_string();
        let spec = window_spec.to_string();
        let handle =
            tokio::spawn(async move { registry::register_task(&inner, &task_id, &spec).await });
        self.inner.barrier.register(handle);

        debug!("任务 {} 已提交注册", id);
        Ok(())
    }

    /// 等待所有已发起的注册完成
    pub async fn ready(&self) -> FreshdResult<()> {
        self.inner.barrier.wait().await
    }

    /// 手动执行一次指定任务
    ///
    /// 只有启动屏障的失败会传播给调用方；执行期间的失败以事件和
    /// 持久化的结果字段呈现。
    pub async fn run(&self, id: &str) -> FreshdResult<()> {
        self.inner.barrier.wait().await?;
        executor::run_task(Arc::clone(&self.inner), id).await;
        Ok(())
    }

    /// 返回所有持久化的任务记录，不做过滤
    pub async fn report(&self) -> FreshdResult<Vec<TaskRecord>> {
        self.inner.barrier.wait().await?;
        self.inner.store.find(&RecordQuery::default()).await
    }

    /// 启动轮询循环
    pub fn start(&self) -> PollHandle {
        poll::start(Arc::clone(&self.inner))
    }
}
