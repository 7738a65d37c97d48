//! Storage layer for the payroll engine.
//!
//! Provides persistence for employees, attendance, work logs, salary
//! components and snapshots using `sqlx` over SQLite.
//!
//! # Schema
//!
//! The schema lives in `migrations/` and is applied by [`Database::migrate`].
//!
//! ## Column formats
//!
//! - Money and multipliers are TEXT holding a decimal string, parsed back
//!   into [`Decimal`] on read. A value that fails to parse surfaces as
//!   [`EngineError::CorruptRecord`].
//! - Months are TEXT in `YYYY-MM` form.
//! - Dates are TEXT in `YYYY-MM-DD` form.
//! - Timestamps are TEXT in RFC 3339 UTC with nanoseconds
//!   (`2025-01-15T10:30:00.000000000Z`), so lexicographic order matches
//!   chronological order and window filters can compare strings.

mod attendance;
mod employees;
mod salary;
mod work_logs;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{AdditionalComponent, Attendance, Employee, ExtraInfo, Month, WorkLog};

/// How long a connection waits on another connection's lock before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pooled handle to the payroll store.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Wraps an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for the configured database. Does not migrate.
    ///
    /// File databases run in WAL mode, and a connection waits up to
    /// [`BUSY_TIMEOUT`] for a lock held by another connection.
    pub async fn connect(config: &DatabaseConfig) -> EngineResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        info!(url = %config.url, max_connections = config.max_connections, "connected to database");
        Ok(Self::new(pool))
    }

    /// Opens a migrated in-memory database.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool
    /// keeps exactly one connection alive for its whole life.
    pub async fn memory() -> EngineResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Self::new(pool);
        db.migrate().await?;
        Ok(db)
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> EngineResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Checks the store answers a trivial query.
    pub async fn ping(&self) -> EngineResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// A transaction opened with `BEGIN IMMEDIATE`.
///
/// The write lock is taken when the transaction starts, so a second writer
/// waits out [`BUSY_TIMEOUT`] instead of failing to upgrade a read lock.
/// Dropping it before [`finish`](Self::finish) rolls back on a spawned task.
pub(crate) struct WriteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTransaction {
    pub(crate) async fn begin(pool: &SqlitePool) -> EngineResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    /// The connection holding the transaction.
    pub(crate) fn conn(&mut self) -> EngineResult<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or(EngineError::Database(sqlx::Error::PoolClosed))
    }

    /// Commits if `result` is `Ok`, rolls back otherwise, and passes the
    /// result through. A failed commit is returned in its place.
    pub(crate) async fn finish<T>(mut self, result: EngineResult<T>) -> EngineResult<T> {
        let statement = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
        let ended = sqlx::query(statement).execute(self.conn()?).await;
        match ended {
            Ok(_) => {
                self.conn.take();
                result
            }
            Err(err) => {
                warn!(error = %err, statement, "failed to end write transaction");
                Err(result.err().unwrap_or_else(|| err.into()))
            }
        }
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                        warn!(error = %err, "rollback of abandoned write failed, closing connection");
                        drop(conn.detach());
                    }
                });
            }
            // Closing the handle rolls back.
            Err(_) => drop(conn.detach()),
        }
    }
}

/// The reads the salary calculator depends on.
///
/// [`Database`] is the production source; tests substitute in-memory
/// fakes.
pub trait SalarySource: Send + Sync {
    /// Returns the employee, or `NotFound`.
    fn get_employee(&self, id: i64) -> impl Future<Output = EngineResult<Employee>> + Send;

    /// Returns the employee's attendance from `from` to `to` inclusive,
    /// with the attendance type joined.
    fn get_attendances_between(
        &self,
        employee_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = EngineResult<Vec<Attendance>>> + Send;

    /// Returns the employee's live work logs created from `from` to `to`
    /// inclusive, with live units joined to their work type.
    fn get_work_logs_between(
        &self,
        employee_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = EngineResult<Vec<WorkLog>>> + Send;

    /// Returns the employee's additional components for the month.
    fn get_additional_components(
        &self,
        employee_id: i64,
        month: Month,
    ) -> impl Future<Output = EngineResult<Vec<AdditionalComponent>>> + Send;

    /// Returns the employee's extra infos for the month.
    fn get_extra_infos(
        &self,
        employee_id: i64,
        month: Month,
    ) -> impl Future<Output = EngineResult<Vec<ExtraInfo>>> + Send;
}

impl SalarySource for Database {
    async fn get_employee(&self, id: i64) -> EngineResult<Employee> {
        Database::get_employee(self, id).await
    }

    async fn get_attendances_between(
        &self,
        employee_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<Attendance>> {
        self.list_attendances(from, to, Some(employee_id)).await
    }

    async fn get_work_logs_between(
        &self,
        employee_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<WorkLog>> {
        self.list_work_logs(from, to, Some(employee_id)).await
    }

    async fn get_additional_components(
        &self,
        employee_id: i64,
        month: Month,
    ) -> EngineResult<Vec<AdditionalComponent>> {
        self.list_additional_components(employee_id, month).await
    }

    async fn get_extra_infos(&self, employee_id: i64, month: Month) -> EngineResult<Vec<ExtraInfo>> {
        self.list_extra_infos(employee_id, month).await
    }
}

/// Formats an instant the way every timestamp column stores it.
pub(crate) fn encode_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_decimal(
    entity: &'static str,
    id: i64,
    column: &str,
    value: &str,
) -> EngineResult<Decimal> {
    Decimal::from_str(value).map_err(|e| EngineError::CorruptRecord {
        entity,
        id,
        message: format!("{}: {}", column, e),
    })
}

pub(crate) fn decode_month(entity: &'static str, id: i64, value: &str) -> EngineResult<Month> {
    value.parse().map_err(|e| EngineError::CorruptRecord {
        entity,
        id,
        message: format!("month: {}", e),
    })
}

/// Fails with `NotFound` unless the employee exists.
pub(crate) async fn ensure_employee(conn: &mut SqliteConnection, id: i64) -> EngineResult<()> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM employees WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(|_| ())
        .ok_or(EngineError::NotFound {
            entity: "employee",
            id,
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::Database;
    use crate::config::DatabaseConfig;
    use crate::models::Employee;

    pub async fn db() -> Database {
        Database::memory().await.unwrap()
    }

    /// A migrated database file with a multi-connection pool. Keep the
    /// directory alive for as long as the database is used.
    pub async fn file_db(max_connections: u32) -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("payroll.db").display()),
            max_connections,
        };
        let db = Database::connect(&config).await.unwrap();
        db.migrate().await.unwrap();
        (dir, db)
    }

    pub async fn employee(db: &Database, name: &str, shift_fee: &str) -> Employee {
        db.create_employee(name, Decimal::from_str(shift_fee).unwrap())
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_memory_database_migrates_and_pings() {
        let db = testing::db().await;
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = testing::db().await;
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_database_uses_wal() {
        let (_dir, db) = testing::file_db(2).await;
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[tokio::test]
    async fn test_write_transaction_rolls_back_on_error() {
        let db = testing::db().await;
        let mut tx = WriteTransaction::begin(db.pool()).await.unwrap();
        sqlx::query("INSERT INTO employees (name, shift_fee, created_at, updated_at) VALUES ('Ani', '1', '', '')")
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
        let err = tx
            .finish::<()>(Err(EngineError::NotFound { entity: "employee", id: 9 }))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(db.list_employees().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_write_transaction_rolls_back() {
        let db = testing::db().await;
        let mut tx = WriteTransaction::begin(db.pool()).await.unwrap();
        sqlx::query("INSERT INTO employees (name, shift_fee, created_at, updated_at) VALUES ('Ani', '1', '', '')")
            .execute(tx.conn().unwrap())
            .await
            .unwrap();
        drop(tx);

        assert!(db.list_employees().await.unwrap().is_empty());
        testing::employee(&db, "Budi", "90000").await;
        assert_eq!(db.list_employees().await.unwrap().len(), 1);
    }

    #[test]
    fn test_timestamps_sort_chronologically_as_text() {
        let earlier = Utc.with_ymd_and_hms(2025, 1, 31, 16, 59, 59).unwrap();
        let later = earlier + chrono::Duration::nanoseconds(1);

        assert!(encode_timestamp(earlier) < encode_timestamp(later));
        assert_eq!(encode_timestamp(earlier), "2025-01-31T16:59:59.000000000Z");
    }

    #[test]
    fn test_decode_decimal_reports_corrupt_record() {
        let err = decode_decimal("employee", 3, "shift_fee", "lots").unwrap_err();
        assert!(matches!(
            err,
            EngineError::CorruptRecord { entity: "employee", id: 3, .. }
        ));
        assert!(err.to_string().contains("shift_fee"));
    }

    #[test]
    fn test_decode_month_reports_corrupt_record() {
        assert!(decode_month("snapshot", 1, "2025-1").is_err());
        assert_eq!(decode_month("snapshot", 1, "2025-01").unwrap(), Month::new(2025, 1).unwrap());
    }

    #[tokio::test]
    async fn test_ensure_employee() {
        let db = testing::db().await;
        let employee = testing::employee(&db, "Ani", "100000").await;
        let mut conn = db.pool().acquire().await.unwrap();

        ensure_employee(&mut conn, employee.id).await.unwrap();
        let err = ensure_employee(&mut conn, employee.id + 1).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
