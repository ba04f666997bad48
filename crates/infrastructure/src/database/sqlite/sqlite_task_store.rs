use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use freshd_core::{FreshdError, FreshdResult};
use freshd_domain::{
    RecordPatch, RecordQuery, TaskRecord, TaskStore, UpdateOptions, UpdateValue,
};

pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建嵌入式SQLite任务存储，自动初始化数据库
    pub async fn new_embedded(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> FreshdResult<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("创建嵌入式SQLite任务存储: {}", database_url);

        // 启用WAL模式，文件不存在时自动创建
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect_with(connect_options)
            .await?;

        Self::run_migrations(&pool).await?;

        debug!("嵌入式SQLite任务存储就绪");
        Ok(Self { pool })
    }

    /// 运行数据库迁移
    async fn run_migrations(pool: &SqlitePool) -> FreshdResult<()> {
        debug!("运行SQLite数据库迁移");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS task_records (
                id TEXT PRIMARY KEY,
                min_age_ms INTEGER NOT NULL,
                max_age_ms INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'waiting',
                last DATETIME,
                last_status TEXT NOT NULL DEFAULT 'no prior run information',
                last_error TEXT,
                last_end DATETIME,
                last_elapsed TEXT,
                last_result TEXT,
                next DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_task_records_next ON task_records(next)",
            "CREATE INDEX IF NOT EXISTS idx_task_records_status ON task_records(status)",
        ];
        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        debug!("SQLite数据库迁移完成");
        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> FreshdResult<TaskRecord> {
        let last_result: Option<String> = row.try_get("last_result")?;
        let last_result = last_result
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?;

        Ok(TaskRecord {
            id: row.try_get("id")?,
            min_age_ms: row.try_get("min_age_ms")?,
            max_age_ms: row.try_get("max_age_ms")?,
            status: row.try_get("status")?,
            last: row.try_get("last")?,
            last_status: row.try_get("last_status")?,
            last_error: row.try_get("last_error")?,
            last_end: row.try_get("last_end")?,
            last_elapsed: row.try_get("last_elapsed")?,
            last_result,
            next: row.try_get("next")?,
        })
    }

    /// 动态拼接WHERE子句，随后按同样的顺序绑定参数
    fn where_clause(query: &RecordQuery, first_bind: usize) -> String {
        let mut clause = String::from(" WHERE 1=1");
        let mut bind = first_bind;
        if query.id.is_some() {
            clause.push_str(&format!(" AND id = ?{bind}"));
            bind += 1;
        }
        if query.next_before.is_some() {
            clause.push_str(&format!(" AND next < ?{bind}"));
            bind += 1;
        }
        if query.status_not.is_some() {
            clause.push_str(&format!(" AND status != ?{bind}"));
        }
        clause
    }

    fn bind_query<'q>(
        mut sqlx_query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        query: &'q RecordQuery,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        if let Some(id) = &query.id {
            sqlx_query = sqlx_query.bind(id);
        }
        if let Some(next_before) = query.next_before {
            sqlx_query = sqlx_query.bind(next_before);
        }
        if let Some(status_not) = query.status_not {
            sqlx_query = sqlx_query.bind(status_not);
        }
        sqlx_query
    }
}

const ALL_COLUMNS: &str = "id, min_age_ms, max_age_ms, status, last, last_status, last_error, last_end, last_elapsed, last_result, next";

#[async_trait]
impl TaskStore for SqliteTaskStore {
    #[instrument(skip(self, record), fields(task_id = %record.id))]
    async fn insert(&self, record: &TaskRecord) -> FreshdResult<TaskRecord> {
        let last_result_json = record
            .last_result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO task_records (id, min_age_ms, max_age_ms, status, last, last_status, last_error, last_end, last_elapsed, last_result, next)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&record.id)
        .bind(record.min_age_ms)
        .bind(record.max_age_ms)
        .bind(record.status)
        .bind(record.last)
        .bind(record.last_status)
        .bind(&record.last_error)
        .bind(record.last_end)
        .bind(&record.last_elapsed)
        .bind(last_result_json)
        .bind(record.next)
        .execute(&self.pool)
        .await?;

        debug!("插入任务记录成功: {}", record.id);
        Ok(record.clone())
    }

    async fn find(&self, query: &RecordQuery) -> FreshdResult<Vec<TaskRecord>> {
        let sql = format!(
            "SELECT {ALL_COLUMNS} FROM task_records{} ORDER BY id",
            Self::where_clause(query, 1)
        );

        let rows = Self::bind_query(sqlx::query(&sql), query)
            .fetch_all(&self.pool)
            .await?;

        let records: FreshdResult<Vec<TaskRecord>> =
            rows.iter().map(Self::row_to_record).collect();
        let records = records?;
        debug!("查询任务记录，返回 {} 条", records.len());
        Ok(records)
    }

    async fn find_one(&self, query: &RecordQuery) -> FreshdResult<TaskRecord> {
        let sql = format!(
            "SELECT {ALL_COLUMNS} FROM task_records{} LIMIT 1",
            Self::where_clause(query, 1)
        );

        let row = Self::bind_query(sqlx::query(&sql), query)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_record(&row),
            None => Err(FreshdError::task_not_found(
                query.id.clone().unwrap_or_else(|| "?".to_string()),
            )),
        }
    }

    #[instrument(skip(self, query, patch, options), fields(task_id = ?query.id, upsert = options.upsert))]
    async fn update(
        &self,
        query: &RecordQuery,
        patch: &RecordPatch,
        options: UpdateOptions,
    ) -> FreshdResult<u64> {
        let mut sets: Vec<String> = Vec::new();
        let mut bind = 1;

        if patch.min_age_ms.is_some() {
            sets.push(format!("min_age_ms = ?{bind}"));
            bind += 1;
        }
        if patch.max_age_ms.is_some() {
            sets.push(format!("max_age_ms = ?{bind}"));
            bind += 1;
        }
        if patch.status.is_some() {
            sets.push(format!("status = ?{bind}"));
            bind += 1;
        }
        match &patch.last {
            UpdateValue::Set(_) => {
                sets.push(format!("last = ?{bind}"));
                bind += 1;
            }
            UpdateValue::Unset => sets.push("last = NULL".to_string()),
            UpdateValue::NoChange => {}
        }
        if patch.last_status.is_some() {
            sets.push(format!("last_status = ?{bind}"));
            bind += 1;
        }
        match &patch.last_error {
            UpdateValue::Set(_) => {
                sets.push(format!("last_error = ?{bind}"));
                bind += 1;
            }
            UpdateValue::Unset => sets.push("last_error = NULL".to_string()),
            UpdateValue::NoChange => {}
        }
        match &patch.last_end {
            UpdateValue::Set(_) => {
                sets.push(format!("last_end = ?{bind}"));
                bind += 1;
            }
            UpdateValue::Unset => sets.push("last_end = NULL".to_string()),
            UpdateValue::NoChange => {}
        }
        match &patch.last_elapsed {
            UpdateValue::Set(_) => {
                sets.push(format!("last_elapsed = ?{bind}"));
                bind += 1;
            }
            UpdateValue::Unset => sets.push("last_elapsed = NULL".to_string()),
            UpdateValue::NoChange => {}
        }
        match &patch.last_result {
            UpdateValue::Set(_) => {
                sets.push(format!("last_result = ?{bind}"));
                bind += 1;
            }
            UpdateValue::Unset => sets.push("last_result = NULL".to_string()),
            UpdateValue::NoChange => {}
        }
        if patch.next.is_some() {
            sets.push(format!("next = ?{bind}"));
            bind += 1;
        }

        if sets.is_empty() {
            debug!("空补丁，跳过更新");
            return Ok(0);
        }

        let last_result_json = match &patch.last_result {
            UpdateValue::Set(value) => Some(serde_json::to_string(value)?),
            _ => None,
        };

        let sql = format!(
            "UPDATE task_records SET {}{}",
            sets.join(", "),
            Self::where_clause(query, bind)
        );

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(v) = patch.min_age_ms {
            sqlx_query = sqlx_query.bind(v);
        }
        if let Some(v) = patch.max_age_ms {
            sqlx_query = sqlx_query.bind(v);
        }
        if let Some(v) = patch.status {
            sqlx_query = sqlx_query.bind(v);
        }
        if let UpdateValue::Set(v) = &patch.last {
            sqlx_query = sqlx_query.bind(*v);
        }
        if let Some(v) = patch.last_status {
            sqlx_query = sqlx_query.bind(v);
        }
        if let UpdateValue::Set(v) = &patch.last_error {
            sqlx_query = sqlx_query.bind(v);
        }
        if let UpdateValue::Set(v) = &patch.last_end {
            sqlx_query = sqlx_query.bind(*v);
        }
        if let UpdateValue::Set(v) = &patch.last_elapsed {
            sqlx_query = sqlx_query.bind(v);
        }
        if let Some(json) = &last_result_json {
            sqlx_query = sqlx_query.bind(json);
        }
        if let Some(v) = patch.next {
            sqlx_query = sqlx_query.bind(v);
        }
        sqlx_query = Self::bind_query(sqlx_query, query);

        let affected = sqlx_query.execute(&self.pool).await?.rows_affected();

        if affected == 0 && options.upsert {
            let id = query
                .id
                .clone()
                .ok_or_else(|| FreshdError::store_error("upsert查询缺少id"))?;
            let mut seeded = TaskRecord::new(id, 0, 0, chrono::Utc::now());
            patch.apply(&mut seeded);
            debug!("更新无匹配，upsert创建记录: {}", seeded.id);

            let last_result_json = seeded
                .last_result
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO task_records (id, min_age_ms, max_age_ms, status, last, last_status, last_error, last_end, last_elapsed, last_result, next)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&seeded.id)
            .bind(seeded.min_age_ms)
            .bind(seeded.max_age_ms)
            .bind(seeded.status)
            .bind(seeded.last)
            .bind(seeded.last_status)
            .bind(&seeded.last_error)
            .bind(seeded.last_end)
            .bind(&seeded.last_elapsed)
            .bind(last_result_json)
            .bind(seeded.next)
            .execute(&self.pool)
            .await?;

            return Ok(1);
        }

        Ok(affected)
    }
}
