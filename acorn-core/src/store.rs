//! Persistent vector store.
//!
//! A process-local SQLite database holding one row per embedded source
//! entity, keyed by entity id with upsert semantics and a secondary index on
//! `record_type` for filtered scans. The daemon opens exactly one handle at
//! start and hands clones to its subsystems; UI surfaces never touch the
//! file directly, only the IPC bus.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::DatabaseConfig;
use crate::error::AcornError;
use crate::models::{RecordType, VectorRecord, VectorStats};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vectors (
    id          TEXT PRIMARY KEY,
    record_type TEXT NOT NULL,
    content     TEXT NOT NULL,
    vector      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vectors_record_type ON vectors(record_type);
"#;

/// Handle to the vector database. Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct VectorStore {
    pool: SqlitePool,
}

impl VectorStore {
    /// Open (creating if missing) the store at the configured path and
    /// ensure the schema exists.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, AcornError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests. Single connection, since each SQLite
    /// `:memory:` connection is its own database.
    pub async fn open_in_memory() -> Result<Self, AcornError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Close the underlying pool. Outstanding clones become unusable.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert or fully replace the record with the same id. Idempotent.
    pub async fn put(&self, record: &VectorRecord) -> Result<(), AcornError> {
        let vector_json = serde_json::to_string(&record.vector)
            .map_err(|e| sqlx::Error::Encode(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO vectors (id, record_type, content, vector, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(id) DO UPDATE SET
                record_type = excluded.record_type,
                content     = excluded.content,
                vector      = excluded.vector,
                created_at  = excluded.created_at
            "#,
        )
        .bind(&record.id)
        .bind(record.record_type.as_str())
        .bind(&record.content)
        .bind(&vector_json)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %record.id, kind = %record.record_type, "Vector stored");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<VectorRecord>, AcornError> {
        let row: Option<VectorRow> = sqlx::query_as(
            "SELECT id, record_type, content, vector, created_at FROM vectors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(VectorRow::into_record).transpose()?)
    }

    /// Full scan. No ordering guarantee with respect to insertion.
    pub async fn list_all(&self) -> Result<Vec<VectorRecord>, AcornError> {
        let rows: Vec<VectorRow> = sqlx::query_as(
            "SELECT id, record_type, content, vector, created_at FROM vectors",
        )
        .fetch_all(&self.pool)
        .await?;

        let records: Vec<VectorRecord> = rows
            .into_iter()
            .map(VectorRow::into_record)
            .collect::<Result<_, sqlx::Error>>()?;
        Ok(records)
    }

    /// Scan restricted to one record type via the secondary index.
    pub async fn list_by_type(
        &self,
        record_type: RecordType,
    ) -> Result<Vec<VectorRecord>, AcornError> {
        let rows: Vec<VectorRow> = sqlx::query_as(
            "SELECT id, record_type, content, vector, created_at FROM vectors
             WHERE record_type = $1",
        )
        .bind(record_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        let records: Vec<VectorRecord> = rows
            .into_iter()
            .map(VectorRow::into_record)
            .collect::<Result<_, sqlx::Error>>()?;
        Ok(records)
    }

    /// Remove the record with the given id. A missing id is not an error.
    pub async fn delete(&self, id: &str) -> Result<(), AcornError> {
        let result = sqlx::query("DELETE FROM vectors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(id = %id, "Vector deleted");
        }
        Ok(())
    }

    /// Remove every record unconditionally.
    pub async fn clear(&self) -> Result<(), AcornError> {
        sqlx::query("DELETE FROM vectors").execute(&self.pool).await?;
        tracing::info!("Vector store cleared");
        Ok(())
    }

    /// Per-type record counts. O(n) over the store, which is sized for a
    /// single user's capture history.
    pub async fn stats(&self) -> Result<VectorStats, AcornError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT record_type, COUNT(*) FROM vectors GROUP BY record_type")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = VectorStats {
            total: 0,
            tweets: 0,
            inspirations: 0,
        };
        for (kind, count) in rows {
            let count = count as usize;
            stats.total += count;
            match kind.as_str() {
                "tweet" => stats.tweets += count,
                "inspiration" => stats.inspirations += count,
                other => tracing::warn!(kind = other, count, "Unknown record type in store"),
            }
        }
        Ok(stats)
    }
}

#[derive(sqlx::FromRow)]
struct VectorRow {
    id: String,
    record_type: String,
    content: String,
    vector: String,
    created_at: DateTime<Utc>,
}

impl VectorRow {
    fn into_record(self) -> Result<VectorRecord, sqlx::Error> {
        let record_type: RecordType = self
            .record_type
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        let vector: Vec<f32> =
            serde_json::from_str(&self.vector).map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(VectorRecord {
            id: self.id,
            record_type,
            content: self.content,
            vector,
            created_at: self.created_at,
        })
    }
}
