//! Mock implementations of the store trait
//!
//! In-memory `TaskStore` that can be used for unit testing without an
//! actual database. Supports failure injection and call counting for
//! loop-behavior assertions.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use freshd_core::{FreshdError, FreshdResult};
use freshd_domain::{RecordPatch, RecordQuery, TaskRecord, TaskStore, UpdateOptions};

/// Mock implementation of TaskStore for testing
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    records: Arc<Mutex<HashMap<String, TaskRecord>>>,
    find_calls: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TaskRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.id.clone(), record);
            }
        }
        store
    }

    /// Seed a record directly, bypassing the trait
    pub fn put(&self, record: TaskRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Number of `find` calls issued so far (used to observe poll ticks)
    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// When set, every store operation fails with the given message
    pub fn inject_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(String::from);
    }

    fn check_failure(&self) -> FreshdResult<()> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(FreshdError::store_error(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, record: &TaskRecord) -> FreshdResult<TaskRecord> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(FreshdError::store_error(format!(
                "duplicate key: {}",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn find(&self, query: &RecordQuery) -> FreshdResult<Vec<TaskRecord>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let records = self.records.lock().unwrap();
        let mut matched: Vec<TaskRecord> = records
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }

    async fn find_one(&self, query: &RecordQuery) -> FreshdResult<TaskRecord> {
        self.check_failure()?;
        let records = self.records.lock().unwrap();
        records
            .values()
            .find(|r| query.matches(r))
            .cloned()
            .ok_or_else(|| {
                FreshdError::task_not_found(query.id.clone().unwrap_or_else(|| "?".to_string()))
            })
    }

    async fn update(
        &self,
        query: &RecordQuery,
        patch: &RecordPatch,
        options: UpdateOptions,
    ) -> FreshdResult<u64> {
        self.check_failure()?;
        let mut records = self.records.lock().unwrap();
        let mut affected = 0u64;
        for record in records.values_mut() {
            if query.matches(record) {
                patch.apply(record);
                affected += 1;
            }
        }

        if affected == 0 && options.upsert {
            let id = query.id.clone().ok_or_else(|| {
                FreshdError::store_error("upsert requires an id in the query".to_string())
            })?;
            let mut seeded = TaskRecord::new(id.clone(), 0, 0, Utc::now());
            patch.apply(&mut seeded);
            records.insert(id, seeded);
            affected = 1;
        }

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshd_domain::{TaskStatus, UpdateValue};

    #[tokio::test]
    async fn test_insert_and_find_one() {
        let store = MemoryTaskStore::new();
        let record = TaskRecord::new("a".to_string(), 0, 1000, Utc::now());
        store.insert(&record).await.unwrap();

        let found = store.find_one(&RecordQuery::by_id("a")).await.unwrap();
        assert_eq!(found, record);

        let missing = store.find_one(&RecordQuery::by_id("b")).await;
        assert!(matches!(missing, Err(FreshdError::TaskNotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_with_upsert_creates_record() {
        let store = MemoryTaskStore::new();
        let patch = RecordPatch {
            min_age_ms: Some(500),
            max_age_ms: Some(900),
            status: Some(TaskStatus::Waiting),
            next: Some(Utc::now()),
            ..Default::default()
        };

        let affected = store
            .update(
                &RecordQuery::by_id("new"),
                &patch,
                UpdateOptions { upsert: true },
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(store.get("new").unwrap().min_age_ms, 500);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryTaskStore::new();
        store.inject_failure(Some("store offline"));
        let err = store.find(&RecordQuery::default()).await.unwrap_err();
        assert!(err.to_string().contains("store offline"));

        store.inject_failure(None);
        assert!(store.find(&RecordQuery::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unset_via_update() {
        let store = MemoryTaskStore::new();
        let mut record = TaskRecord::new("a".to_string(), 0, 0, Utc::now());
        record.last_error = Some("boom".to_string());
        store.put(record);

        let patch = RecordPatch {
            last_error: UpdateValue::Unset,
            ..Default::default()
        };
        store
            .update(&RecordQuery::by_id("a"), &patch, UpdateOptions::default())
            .await
            .unwrap();
        assert_eq!(store.get("a").unwrap().last_error, None);
    }
}
