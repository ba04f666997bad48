//! Reusable task handlers for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use freshd_domain::{TaskContext, TaskHandler};

/// Counts invocations and records the contexts it was called with
#[derive(Debug, Default)]
pub struct CountingHandler {
    runs: AtomicUsize,
    contexts: Mutex<Vec<TaskContext>>,
    result: serde_json::Value,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(result: serde_json::Value) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<TaskContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskHandler for CountingHandler {
    async fn run(&self, ctx: TaskContext) -> anyhow::Result<serde_json::Value> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(ctx);
        Ok(self.result.clone())
    }
}

/// Always fails with the configured message
#[derive(Debug)]
pub struct FailingHandler {
    message: String,
    runs: AtomicUsize,
}

impl FailingHandler {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for FailingHandler {
    async fn run(&self, _ctx: TaskContext) -> anyhow::Result<serde_json::Value> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{}", self.message)
    }
}

/// Sleeps for the configured duration before succeeding
#[derive(Debug)]
pub struct SlowHandler {
    delay: Duration,
    runs: AtomicUsize,
}

impl SlowHandler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandler for SlowHandler {
    async fn run(&self, _ctx: TaskContext) -> anyhow::Result<serde_json::Value> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(serde_json::json!("slow done"))
    }
}
