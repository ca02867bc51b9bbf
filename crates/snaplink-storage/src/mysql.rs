use async_trait::async_trait;
use snaplink_core::repository::{ReadRepository, Repository, Result};
use snaplink_core::{ShortCode, ShortLink, StorageError};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;

/// DDL for the `short_urls` table.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

/// MySQL implementation of the repository contract.
///
/// Uniqueness of both the short code and the long URL is enforced by unique
/// keys on the table, so a racing duplicate insert surfaces as
/// [`StorageError::Conflict`]. Deletes remove the row.
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

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("short_urls schema ensured");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
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

fn link_from_row(row: &MySqlRow) -> Result<ShortLink> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;

    let short_code = ShortCode::new(short_code)
        .map_err(|e| StorageError::InvalidData(format!("row {id}: {e}")))?;

    Ok(ShortLink {
        id,
        short_code,
        long_url,
    })
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn get_by_short_code(&self, code: &ShortCode) -> Result<ShortLink> {
        let row = sqlx::query(
            r#"
            SELECT id, short_code, long_url
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => link_from_row(&row),
            None => Err(StorageError::NotFound(code.to_string())),
        }
    }

    async fn get_by_long_url(&self, long_url: &str) -> Result<ShortLink> {
        let row = sqlx::query(
            r#"
            SELECT id, short_code, long_url
            FROM short_urls
            WHERE long_url = ?
            LIMIT 1
            "#,
        )
        .bind(long_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => link_from_row(&row),
            None => Err(StorageError::NotFound(long_url.to_string())),
        }
    }

    async fn count(&self) -> Result<u64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM short_urls
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        u64::try_from(total)
            .map_err(|_| StorageError::InvalidData(format!("negative row count {total}")))
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn insert(&self, link: &ShortLink) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (id, short_code, long_url)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(link.id)
        .bind(link.short_code.as_str())
        .bind(link.long_url.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(link.short_code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM short_urls
            WHERE short_code = ?
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }
        Ok(())
    }
}
