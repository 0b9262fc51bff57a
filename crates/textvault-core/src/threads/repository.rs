//! SQLite-backed thread registry.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::registry::{ThreadError, ThreadRegistry};
use crate::Result;

/// Thread registry persisting conversation threads in SQLite.
///
/// `rebuild` recomputes per-thread message counts and last-message dates
/// from the `records` table, so this repository is expected to share a
/// database with [`crate::MessageRepository`].
#[derive(Clone)]
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    /// Create a new repository with the given database path.
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
            CREATE TABLE IF NOT EXISTS threads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL UNIQUE,
                message_count INTEGER NOT NULL DEFAULT 0,
                last_message_at INTEGER
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl ThreadRegistry for ThreadRepository {
    async fn get_or_create_thread(&self, address: &str) -> std::result::Result<i64, ThreadError> {
        let existing = sqlx::query(r"SELECT id FROM threads WHERE address = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ThreadError::Lookup(e.to_string()))?;

        if let Some(row) = existing {
            return Ok(row.get::<i64, _>("id"));
        }

        let result = sqlx::query(r"INSERT INTO threads (address) VALUES (?)")
            .bind(address)
            .execute(&self.pool)
            .await
            .map_err(|e| ThreadError::Lookup(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn rebuild(&self) -> std::result::Result<(), ThreadError> {
        sqlx::query(
            r"
            UPDATE threads SET
                message_count = (
                    SELECT COUNT(*) FROM records WHERE records.thread_id = threads.id
                ),
                last_message_at = (
                    SELECT MAX(date) FROM records WHERE records.thread_id = threads.id
                )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ThreadError::Rebuild(e.to_string()))?;
        Ok(())
    }
}
