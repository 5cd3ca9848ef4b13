//! SQLite driver for spool queues.
//!
//! Entries live in a single table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS spool_entries (
//!     id      INTEGER PRIMARY KEY AUTOINCREMENT,
//!     payload BLOB NOT NULL,
//!     version TEXT NOT NULL DEFAULT '0'
//! );
//! ```
//!
//! `AUTOINCREMENT` guarantees ids are never reused, so ordering by `id`
//! is FIFO order. `poll` and `mutate` each run in one transaction.
//!
//! # Usage
//!
//! ```rust,ignore
//! use spool_q::storage::sqlite::SqliteDriver;
//!
//! // File backed
//! let driver = SqliteDriver::connect("sqlite://spool.db", "spool_entries").await?;
//!
//! // In-memory (tests)
//! let driver = SqliteDriver::in_memory().await?;
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

use super::error::DriverError;
use super::traits::{BlobMapper, Driver, QueueEntry};
use super::validate_table_name;

pub const DEFAULT_TABLE: &str = "spool_entries";

/// Statements for one table, built once at construction.
#[derive(Debug, Clone)]
struct Statements {
    create_table: String,
    insert: String,
    count: String,
    fetch: String,
    update: String,
    delete_by_id: String,
    delete_by_limit: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            create_table: format!(
                r#"
                CREATE TABLE IF NOT EXISTS "{table}" (
                    id      INTEGER PRIMARY KEY AUTOINCREMENT,
                    payload BLOB NOT NULL,
                    version TEXT NOT NULL DEFAULT '{version}'
                )
                "#,
                version = QueueEntry::DEFAULT_VERSION
            ),
            insert: format!(r#"INSERT INTO "{table}" (payload) VALUES (?)"#),
            count: format!(r#"SELECT COUNT(id) FROM "{table}""#),
            fetch: format!(r#"SELECT id, payload, version FROM "{table}" ORDER BY id LIMIT ?"#),
            update: format!(r#"UPDATE "{table}" SET payload = ? WHERE id = ?"#),
            delete_by_id: format!(r#"DELETE FROM "{table}" WHERE id = ?"#),
            delete_by_limit: format!(
                r#"DELETE FROM "{table}" WHERE id IN (SELECT id FROM "{table}" ORDER BY id LIMIT ?)"#
            ),
        }
    }
}

/// SQLite-backed [`Driver`].
pub struct SqliteDriver {
    /// `None` once closed.
    pool: Option<SqlitePool>,
    table: String,
    sql: Statements,
}

impl SqliteDriver {
    /// Open (creating if missing) the database at `url` and ensure `table` exists.
    ///
    /// `url` is a sqlx SQLite URL such as `sqlite://spool.db` or `sqlite::memory:`.
    pub async fn connect(url: &str, table: &str) -> Result<Self, DriverError> {
        validate_table_name(table)?;

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DriverError::Configuration(format!("invalid sqlite url '{}': {}", url, e)))?
            .create_if_missing(true);

        // The queue actor is the only caller, one connection is enough. Keeping
        // it alive forever also keeps `sqlite::memory:` databases alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DriverError::Unavailable(format!("Failed to open SQLite: {}", e)))?;

        let sql = Statements::for_table(table);
        sqlx::query(&sql.create_table)
            .execute(&pool)
            .await
            .map_err(|e| DriverError::Internal(format!("Failed to initialize schema: {}", e)))?;

        debug!(table, "SQLite driver ready");

        Ok(Self {
            pool: Some(pool),
            table: table.to_string(),
            sql,
        })
    }

    /// A private in-memory database, dropped with the driver.
    pub async fn in_memory() -> Result<Self, DriverError> {
        Self::connect("sqlite::memory:", DEFAULT_TABLE).await
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn pool(&self) -> Result<&SqlitePool, DriverError> {
        self.pool.as_ref().ok_or(DriverError::Closed)
    }

    /// SQLite treats a negative LIMIT as "no limit".
    fn sql_limit(limit: Option<usize>) -> i64 {
        limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1)
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn write(&mut self, blob: Vec<u8>) -> Result<bool, DriverError> {
        let result = sqlx::query(&self.sql.insert)
            .bind(blob)
            .execute(self.pool()?)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count(&mut self) -> Result<usize, DriverError> {
        let count: i64 = sqlx::query_scalar(&self.sql.count)
            .fetch_one(self.pool()?)
            .await?;
        Ok(count as usize)
    }

    async fn peek(&mut self, limit: Option<usize>) -> Result<Vec<Vec<u8>>, DriverError> {
        let rows = sqlx::query(&self.sql.fetch)
            .bind(Self::sql_limit(limit))
            .fetch_all(self.pool()?)
            .await?;
        Ok(rows.iter().map(|row| row.get::<Vec<u8>, _>("payload")).collect())
    }

    async fn poll(&mut self) -> Result<Option<Vec<u8>>, DriverError> {
        let mut tx = self.pool()?.begin().await?;

        let head = sqlx::query(&self.sql.fetch)
            .bind(1_i64)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = head else {
            tx.rollback().await?;
            return Ok(None);
        };

        let id: i64 = row.get("id");
        let payload: Vec<u8> = row.get("payload");
        let deleted = sqlx::query(&self.sql.delete_by_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(DriverError::Internal(format!(
                "entry {} vanished during poll",
                id
            )));
        }

        tx.commit().await?;
        Ok(Some(payload))
    }

    async fn remove(&mut self, limit: Option<usize>) -> Result<usize, DriverError> {
        let result = sqlx::query(&self.sql.delete_by_limit)
            .bind(Self::sql_limit(limit))
            .execute(self.pool()?)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn mutate(&mut self, mapper: &BlobMapper) -> Result<usize, DriverError> {
        let mut tx = self.pool()?.begin().await?;

        let rows = sqlx::query(&self.sql.fetch)
            .bind(-1_i64)
            .fetch_all(&mut *tx)
            .await?;

        let mut updated = 0;
        for row in rows {
            let id: i64 = row.get("id");
            let payload: Vec<u8> = row.get("payload");
            let mapped = match mapper(&payload) {
                Ok(mapped) => mapped,
                Err(e) => {
                    tx.rollback().await?;
                    return Err(DriverError::Mapper(e));
                }
            };

            let result = sqlx::query(&self.sql.update)
                .bind(mapped)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            updated += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            debug!(table = %self.table, "SQLite driver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::conformance;

    #[tokio::test]
    async fn test_sqlite_conformance() {
        conformance::run_all(|| async { SqliteDriver::in_memory().await.unwrap() }).await;
    }

    #[tokio::test]
    async fn test_sqlite_rejects_bad_table_name() {
        let err = SqliteDriver::connect("sqlite::memory:", "entries; DROP TABLE x")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DriverError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_sqlite_entries_persist_across_reopen() {
        let dir = std::env::temp_dir().join(format!("spool-q-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let url = format!("sqlite://{}", dir.join("queue.db").display());

        let mut driver = SqliteDriver::connect(&url, "uploads").await.unwrap();
        driver.write(b"first".to_vec()).await.unwrap();
        driver.write(b"second".to_vec()).await.unwrap();
        driver.close().await;

        let mut reopened = SqliteDriver::connect(&url, "uploads").await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        assert_eq!(reopened.poll().await.unwrap(), Some(b"first".to_vec()));
        reopened.close().await;

        let _ = std::fs::remove_dir_all(&dir);
    }
}
