//! SQLite-backed record storage.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{
    MESSAGE_TYPE_DRAFT, MMS_TYPE_DELIVERY_REPORT, Record, RecordIdentity, RecordKind,
};
use super::source::{GroupFilter, InsertOutcome, LocalMessageStore, RecordSource};
use crate::Result;

/// Repository for local message and call-log records.
///
/// Implements both sides of the local-store contract: the queryable
/// [`RecordSource`] used by backup and the [`LocalMessageStore`] insertion
/// collaborator used by restore.
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
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

    /// The underlying connection pool, for collaborators sharing the database.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                date INTEGER NOT NULL,
                type_code INTEGER NOT NULL,
                address TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                is_read INTEGER NOT NULL DEFAULT 0,
                protocol TEXT,
                service_center TEXT,
                status TEXT,
                duration INTEGER,
                thread_id INTEGER,
                contact_id INTEGER
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_records_kind_date
            ON records(kind, date)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Per-kind exclusion of records that must never be backed up.
fn exclusion_clause(kind: RecordKind) -> String {
    match kind {
        RecordKind::Sms => format!(" AND type_code <> {MESSAGE_TYPE_DRAFT}"),
        RecordKind::Mms => format!(" AND type_code <> {MMS_TYPE_DELIVERY_REPORT}"),
        RecordKind::CallLog => String::new(),
    }
}

/// Contact-group restriction as SQL, empty when the filter does not apply.
fn group_clause(kind: RecordKind, filter: &GroupFilter) -> String {
    if !filter.applies_to(kind) {
        return String::new();
    }
    match filter {
        GroupFilter::Everybody => String::new(),
        GroupFilter::Contacts(ids) => {
            let ids = ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            format!(
                " AND (type_code = {} OR contact_id IN ({ids}))",
                super::model::MESSAGE_TYPE_SENT
            )
        }
    }
}

fn row_to_record(row: &SqliteRow) -> Option<Record> {
    let kind = RecordKind::parse(&row.get::<String, _>("kind"))?;
    Some(Record {
        kind,
        timestamp: row.get("date"),
        type_code: row.get("type_code"),
        address: row.get("address"),
        body: row.get("body"),
        read: row.get::<bool, _>("is_read"),
        protocol: row.get("protocol"),
        service_center: row.get("service_center"),
        status: row.get("status"),
        duration: row.get::<Option<i64>, _>("duration").and_then(|d| u32::try_from(d).ok()),
        thread_id: row.get("thread_id"),
        contact_id: row.get("contact_id"),
    })
}

impl RecordSource for MessageRepository {
    async fn query(
        &self,
        kind: RecordKind,
        since: i64,
        max: Option<usize>,
        filter: &GroupFilter,
    ) -> Result<Vec<Record>> {
        if max == Some(0) {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT * FROM records WHERE kind = ? AND date > ?{}{} ORDER BY date ASC",
            exclusion_clause(kind),
            group_clause(kind, filter)
        );
        if let Some(max) = max {
            sql.push_str(&format!(" LIMIT {max}"));
        }

        let rows = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(row_to_record).collect())
    }

    async fn max_timestamp(&self, kind: RecordKind) -> Result<Option<i64>> {
        let row = sqlx::query(r"SELECT MAX(date) as max_date FROM records WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<Option<i64>, _>("max_date"))
    }
}

impl LocalMessageStore for MessageRepository {
    async fn exists(&self, identity: &RecordIdentity) -> Result<bool> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count FROM records
            WHERE date = ? AND address = ? AND type_code = ?
            ",
        )
        .bind(identity.timestamp)
        .bind(&identity.address)
        .bind(identity.type_code)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn insert(&self, record: &Record) -> Result<InsertOutcome> {
        if self.exists(&record.identity()).await? {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let result = sqlx::query(
            r"
            INSERT INTO records
                (kind, date, type_code, address, body, is_read, protocol,
                 service_center, status, duration, thread_id, contact_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(record.kind.as_str())
        .bind(record.timestamp)
        .bind(record.type_code)
        .bind(&record.address)
        .bind(&record.body)
        .bind(record.read)
        .bind(&record.protocol)
        .bind(&record.service_center)
        .bind(&record.status)
        .bind(record.duration.map(i64::from))
        .bind(record.thread_id)
        .bind(record.contact_id)
        .execute(&self.pool)
        .await?;

        Ok(InsertOutcome::Inserted(result.last_insert_rowid()))
    }
}
