//! SQLite-backed watermark storage.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{SyncDirection, WatermarkStore};
use crate::Result;
use crate::record::RecordKind;

/// Repository persisting one watermark per (kind × direction).
pub struct WatermarkRepository {
    pool: SqlitePool,
}

impl WatermarkRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;
        Self::with_pool(pool).await
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    /// Create a repository over an existing pool.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS watermarks (
                kind TEXT NOT NULL,
                direction TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (kind, direction)
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl WatermarkStore for WatermarkRepository {
    async fn get(&self, kind: RecordKind, direction: SyncDirection) -> Result<Option<i64>> {
        let row = sqlx::query(
            r"SELECT timestamp FROM watermarks WHERE kind = ? AND direction = ?",
        )
        .bind(kind.as_str())
        .bind(direction.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get::<i64, _>("timestamp")))
    }

    async fn set(&self, kind: RecordKind, direction: SyncDirection, timestamp: i64) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO watermarks (kind, direction, timestamp, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(kind, direction) DO UPDATE SET
                timestamp = MAX(timestamp, excluded.timestamp),
                updated_at = excluded.updated_at
            ",
        )
        .bind(kind.as_str())
        .bind(direction.as_str())
        .bind(timestamp)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_first_sync(&self) -> Result<bool> {
        let row = sqlx::query(
            r"SELECT COUNT(*) as count FROM watermarks WHERE direction = ?",
        )
        .bind(SyncDirection::Backup.as_str())
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        Ok(count == 0)
    }
}
