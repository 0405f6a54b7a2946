use async_trait::async_trait;
use jiff::Timestamp;
use shortlink_core::repository::{ClickOutcome, Repository, Result};
use shortlink_core::{ClickEvent, LinkRecord, ShortCode, StorageError};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

/// DDL for the tables this repository reads and writes, in creation order.
pub const SCHEMA: [&str; 2] = [
    include_str!("../ddl/mysql/short_links.sql"),
    include_str!("../ddl/mysql/link_clicks.sql"),
];

/// MySQL implementation of the repository contract.
///
/// Links live in `short_links`, their clicks in `link_clicks`. Short codes
/// use a binary collation so lookups are case-sensitive. Timestamps are
/// stored as Unix milliseconds. Click appends lock the link row
/// (`SELECT ... FOR UPDATE`) so the expiry check, the insert and the
/// counter update commit together.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn click_from_row(row: &MySqlRow) -> Result<ClickEvent> {
    let clicked_at: i64 = row.try_get("clicked_at").map_err(map_sqlx_error)?;

    Ok(ClickEvent {
        timestamp: parse_timestamp("clicked_at", clicked_at)?,
        referrer: row.try_get("referrer").map_err(map_sqlx_error)?,
        source: row.try_get("source").map_err(map_sqlx_error)?,
        user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        // Both reads share one InnoDB snapshot, so the stored counter and the
        // click rows describe the same state.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(
            r#"
            SELECT original_url, created_at, expiry_at, click_count
            FROM short_links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            tx.commit().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };

        let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
        let expiry_at: i64 = row.try_get("expiry_at").map_err(map_sqlx_error)?;
        let click_count: i64 = row.try_get("click_count").map_err(map_sqlx_error)?;

        let click_rows = sqlx::query(
            r#"
            SELECT clicked_at, referrer, source, user_agent
            FROM link_clicks
            WHERE short_code = ?
            ORDER BY id
            "#,
        )
        .bind(code.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        let clicks = click_rows
            .iter()
            .map(click_from_row)
            .collect::<Result<Vec<_>>>()?;

        if usize::try_from(click_count).ok() != Some(clicks.len()) {
            return Err(StorageError::InvalidData(format!(
                "click_count {click_count} of '{code}' does not match {} click rows",
                clicks.len()
            )));
        }

        let record = LinkRecord::new(
            code.clone(),
            original_url,
            parse_timestamp("created_at", created_at)?,
            parse_timestamp("expiry_at", expiry_at)?,
        )
        .with_clicks(clicks);

        Ok(Some(record))
    }

    async fn insert_if_absent(&self, record: LinkRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_links (short_code, original_url, created_at, expiry_at, click_count)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(record.short_code.as_str())
        .bind(&record.original_url)
        .bind(record.created_at.as_millisecond())
        .bind(record.expiry_at.as_millisecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn append_click(
        &self,
        code: &ShortCode,
        click: ClickEvent,
        now: Timestamp,
    ) -> Result<ClickOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let expiry_at: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT expiry_at
            FROM short_links
            WHERE short_code = ?
            FOR UPDATE
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(expiry_at) = expiry_at else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(ClickOutcome::NotFound);
        };

        let expiry_at = parse_timestamp("expiry_at", expiry_at)?;
        if now > expiry_at {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(ClickOutcome::Expired { expired_at: expiry_at });
        }

        sqlx::query(
            r#"
            INSERT INTO link_clicks (short_code, clicked_at, referrer, source, user_agent)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(code.as_str())
        .bind(click.timestamp.as_millisecond())
        .bind(click.referrer)
        .bind(click.source)
        .bind(click.user_agent)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            UPDATE short_links
            SET click_count = click_count + 1
            WHERE short_code = ?
            "#,
        )
        .bind(code.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(ClickOutcome::Recorded)
    }

    async fn delete_expired(&self, before: Timestamp) -> Result<u64> {
        let before = before.as_millisecond();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            DELETE FROM link_clicks
            WHERE short_code IN (
                SELECT short_code FROM short_links WHERE expiry_at < ?
            )
            "#,
        )
        .bind(before)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            DELETE FROM short_links
            WHERE expiry_at < ?
            "#,
        )
        .bind(before)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
