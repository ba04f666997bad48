//! 嵌入式应用装配
//!
//! 按配置把存储与引擎组装为一个可嵌入宿主进程的应用：
//! 准备存储目录，打开SQLite存储，创建引擎并暴露注册/启动/报表入口。

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use freshd_core::AppConfig;
use freshd_domain::{EventEnvelope, TaskHandler, TaskRecord};
use freshd_engine::{FreshnessEngine, PollHandle};
use freshd_infrastructure::{provision_storage, sqlite_url, SqliteTaskStore};

pub struct FreshdApp {
    config: AppConfig,
    engine: FreshnessEngine,
}

impl FreshdApp {
    /// 创建嵌入式应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        config.validate().context("配置校验失败")?;
        info!("初始化嵌入式保鲜调度应用");

        provision_storage(&config.storage.path).context("准备存储目录失败")?;
        let store = SqliteTaskStore::new_embedded(
            &sqlite_url(&config.storage.path),
            config.storage.max_connections,
            config.storage.min_connections,
        )
        .await
        .context("初始化SQLite任务存储失败")?;

        let engine = FreshnessEngine::with_event_capacity(
            Arc::new(store),
            config.cooldown(),
            config.engine.event_capacity,
        );

        info!("✅ 嵌入式应用初始化完成，存储: {}", config.storage.path);
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn engine(&self) -> &FreshnessEngine {
        &self.engine
    }

    /// 订阅任务生命周期事件
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventEnvelope> {
        self.engine.subscribe()
    }

    /// 注册一个任务，必须发生在 `start()` 之前
    pub async fn schedule(
        &self,
        id: &str,
        window_spec: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<()> {
        self.engine
            .schedule(id, window_spec, handler)
            .await
            .with_context(|| format!("注册任务 {id} 失败"))
    }

    /// 等待全部注册完成并启动轮询循环
    ///
    /// 任一注册失败会让启动整体失败，不会带着不完整的注册集开跑。
    pub async fn start(&self) -> Result<PollHandle> {
        self.engine.ready().await.context("任务注册未全部完成")?;
        info!("启动轮询循环，冷却间隔: {}", self.config.engine.cooldown);
        Ok(self.engine.start())
    }

    /// 手动执行一次指定任务
    pub async fn run(&self, id: &str) -> Result<()> {
        self.engine
            .run(id)
            .await
            .with_context(|| format!("手动执行任务 {id} 失败"))
    }

    /// 返回所有持久化的任务记录
    pub async fn report(&self) -> Result<Vec<TaskRecord>> {
        self.engine.report().await.context("读取任务报表失败")
    }
}
