//! 冷却驱动的轮询循环

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use freshd_domain::RecordQuery;

use crate::engine::EngineInner;
use crate::executor;

/// 轮询循环句柄，持有者负责在退出前停止循环
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollHandle {
    /// 停止轮询并等待循环退出
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!("轮询循环退出异常: {e}");
        }
    }
}

/// 启动轮询循环
///
/// 首次扫描发生在下一个调度机会，此后每个冷却间隔扫描一次，
/// 与任务处理逻辑的耗时无关。
pub(crate) fn start(inner: Arc<EngineInner>) -> PollHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let cooldown = inner.cooldown;

    let handle = tokio::spawn(async move {
        info!("轮询循环启动，冷却间隔 {:?}", cooldown);
        let mut ticker = tokio::time::interval(cooldown);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tick(&inner).await;
                }
                _ = shutdown_rx.changed() => {
                    info!("轮询循环收到停止信号");
                    break;
                }
            }
        }
    });

    PollHandle { shutdown, handle }
}

/// 执行一轮扫描：查询到期且未在运行的任务，逐个派发执行
///
/// 派发后不等待完成；查询失败只记录日志，循环照常继续。
pub(crate) async fn tick(inner: &Arc<EngineInner>) {
    if let Err(e) = inner.barrier.wait().await {
        error!("注册未全部完成，跳过本轮扫描: {}", e);
        return;
    }

    match inner.store.find(&RecordQuery::due_at(Utc::now())).await {
        Ok(due) => {
            if !due.is_empty() {
                debug!("本轮扫描发现 {} 个到期任务", due.len());
            }
            for record in due {
                let inner = Arc::clone(inner);
                tokio::spawn(async move {
                    executor::run_task(inner, &record.id).await;
                });
            }
        }
        Err(e) => {
            error!("扫描到期任务失败: {}", e);
        }
    }
}
