//! 启动同步屏障
//!
//! 在任何任务执行（轮询触发或手动触发）之前，等待所有已发起的注册完成。
//! 首次等待会封存屏障，此后不会再接纳新的注册结果。

use std::sync::Mutex;

use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{error, info};

use freshd_core::{FreshdError, FreshdResult};
use freshd_domain::TaskRecord;

pub struct StartupBarrier {
    pending: Mutex<Vec<JoinHandle<FreshdResult<TaskRecord>>>>,
    outcome: OnceCell<FreshdResult<()>>,
}

impl StartupBarrier {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            outcome: OnceCell::new(),
        }
    }

    /// 登记一个进行中的注册
    pub fn register(&self, handle: JoinHandle<FreshdResult<TaskRecord>>) {
        match self.pending.lock() {
            Ok(mut pending) => pending.push(handle),
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
    }

    /// 屏障是否已封存
    pub fn is_sealed(&self) -> bool {
        self.outcome.initialized()
    }

    /// 等待所有注册完成
    ///
    /// 首次调用执行等待并缓存结果；后续调用直接返回缓存结果。
    /// 任一注册失败时，所有等待方都会收到包装了首个失败详情的同一个错误。
    pub async fn wait(&self) -> FreshdResult<()> {
        self.outcome
            .get_or_init(|| async {
                let handles: Vec<_> = match self.pending.lock() {
                    Ok(mut pending) => pending.drain(..).collect(),
                    Err(poisoned) => poisoned.into_inner().drain(..).collect(),
                };
                let total = handles.len();

                let mut first_failure: Option<FreshdError> = None;
                for result in futures::future::join_all(handles).await {
                    let failure = match result {
                        Ok(Ok(_)) => None,
                        Ok(Err(e)) => Some(e),
                        Err(join_err) => Some(FreshdError::Internal(format!(
                            "注册任务意外终止: {join_err}"
                        ))),
                    };
                    if let Some(e) = failure {
                        error!("任务注册失败: {}", e);
                        if first_failure.is_none() {
                            first_failure = Some(e);
                        }
                    }
                }

                match first_failure {
                    Some(e) => Err(FreshdError::registration_failed(e)),
                    None => {
                        info!("启动屏障通过，共 {} 个任务注册完成", total);
                        Ok(())
                    }
                }
            })
            .await
            .clone()
    }
}

impl Default for StartupBarrier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dummy_record() -> TaskRecord {
        TaskRecord::new("t".to_string(), 0, 0, Utc::now())
    }

    #[tokio::test]
    async fn test_wait_passes_when_all_succeed() {
        let barrier = StartupBarrier::new();
        barrier.register(tokio::spawn(async { Ok(dummy_record()) }));
        barrier.register(tokio::spawn(async { Ok(dummy_record()) }));

        assert!(barrier.wait().await.is_ok());
        assert!(barrier.is_sealed());
        // 幂等
        assert!(barrier.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_wraps_first_failure() {
        let barrier = StartupBarrier::new();
        barrier.register(tokio::spawn(async { Ok(dummy_record()) }));
        barrier.register(tokio::spawn(async {
            Err(FreshdError::invalid_window("nope", "无法识别的窗口形式"))
        }));

        let err = barrier.wait().await.unwrap_err();
        assert!(matches!(err, FreshdError::RegistrationFailed { .. }));
        assert!(err.to_string().contains("nope"));

        // 失败结果同样被缓存，每个等待方拿到同一个错误
        let err_again = barrier.wait().await.unwrap_err();
        assert_eq!(err.to_string(), err_again.to_string());
    }

    #[tokio::test]
    async fn test_panicked_registration_surfaces_as_internal() {
        let barrier = StartupBarrier::new();
        barrier.register(tokio::spawn(async { panic!("boom") }));

        let err = barrier.wait().await.unwrap_err();
        assert!(matches!(err, FreshdError::RegistrationFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_barrier_passes() {
        let barrier = StartupBarrier::new();
        assert!(barrier.wait().await.is_ok());
    }
}
