//! Work-log ledger persistence.
//!
//! A log and its units are written in one transaction. Deleting a log marks
//! the log and its units rather than removing them; marked rows are left
//! out of every read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection};
use tracing::info;

use super::{Database, WriteTransaction, decode_decimal, encode_timestamp, ensure_employee};
use crate::error::{EngineError, EngineResult};
use crate::models::{CreateWorkLogRequest, WorkLog, WorkLogUnit, WorkType};

const SELECT_UNITS: &str = "
    SELECT u.id, u.work_log_id, u.work_outcome, u.work_multiplier,
           w.id AS work_type_id, w.name AS work_type_name, w.outcome_unit AS work_type_outcome_unit,
           w.multiplier AS work_type_multiplier, w.notes AS work_type_notes
    FROM work_log_units u
    JOIN work_logs l ON l.id = u.work_log_id
    JOIN work_types w ON w.id = u.work_type_id";

#[derive(Debug, FromRow)]
struct WorkTypeRow {
    id: i64,
    name: String,
    outcome_unit: String,
    multiplier: String,
    notes: String,
}

impl WorkTypeRow {
    fn into_work_type(self) -> EngineResult<WorkType> {
        Ok(WorkType {
            multiplier: decode_decimal("work type", self.id, "multiplier", &self.multiplier)?,
            id: self.id,
            name: self.name,
            outcome_unit: self.outcome_unit,
            notes: self.notes,
        })
    }
}

#[derive(Debug, FromRow)]
struct WorkLogRow {
    id: i64,
    employee_id: i64,
    patient_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct WorkLogUnitRow {
    id: i64,
    work_log_id: i64,
    work_outcome: String,
    work_multiplier: String,
    work_type_id: i64,
    work_type_name: String,
    work_type_outcome_unit: String,
    work_type_multiplier: String,
    work_type_notes: String,
}

impl WorkLogUnitRow {
    fn into_unit(self) -> EngineResult<(i64, WorkLogUnit)> {
        let work_type = WorkTypeRow {
            id: self.work_type_id,
            name: self.work_type_name,
            outcome_unit: self.work_type_outcome_unit,
            multiplier: self.work_type_multiplier,
            notes: self.work_type_notes,
        }
        .into_work_type()?;

        Ok((
            self.work_log_id,
            WorkLogUnit {
                work_multiplier: decode_decimal(
                    "work log unit",
                    self.id,
                    "work_multiplier",
                    &self.work_multiplier,
                )?,
                id: self.id,
                work_type,
                work_outcome: self.work_outcome,
            },
        ))
    }
}

/// Attaches units to their logs, keeping log order and unit order.
fn assemble(logs: Vec<WorkLogRow>, units: Vec<WorkLogUnitRow>) -> EngineResult<Vec<WorkLog>> {
    let mut units_by_log: HashMap<i64, Vec<WorkLogUnit>> = HashMap::new();
    for row in units {
        let (work_log_id, unit) = row.into_unit()?;
        units_by_log.entry(work_log_id).or_default().push(unit);
    }

    Ok(logs
        .into_iter()
        .map(|log| WorkLog {
            units: units_by_log.remove(&log.id).unwrap_or_default(),
            id: log.id,
            employee_id: log.employee_id,
            patient_name: log.patient_name,
            created_at: log.created_at,
        })
        .collect())
}

async fn load_work_log(conn: &mut SqliteConnection, id: i64) -> EngineResult<WorkLog> {
    let log = sqlx::query_as::<_, WorkLogRow>(
        "SELECT id, employee_id, patient_name, created_at FROM work_logs
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(EngineError::NotFound {
        entity: "work log",
        id,
    })?;

    let units = sqlx::query_as::<_, WorkLogUnitRow>(&format!(
        "{} WHERE u.work_log_id = ? AND u.deleted_at IS NULL ORDER BY u.id",
        SELECT_UNITS
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let mut logs = assemble(vec![log], units)?;
    logs.pop().ok_or(EngineError::NotFound {
        entity: "work log",
        id,
    })
}

async fn insert_work_log(
    conn: &mut SqliteConnection,
    request: &CreateWorkLogRequest,
    created_at: DateTime<Utc>,
) -> EngineResult<WorkLog> {
    ensure_employee(conn, request.employee_id).await?;

    let work_log_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO work_logs (employee_id, patient_name, created_at)
         VALUES (?, ?, ?)
         RETURNING id",
    )
    .bind(request.employee_id)
    .bind(&request.patient_name)
    .bind(encode_timestamp(created_at))
    .fetch_one(&mut *conn)
    .await?;

    for unit in &request.units {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO work_log_units (work_log_id, work_type_id, work_outcome, work_multiplier)
             SELECT ?, id, ?, multiplier FROM work_types WHERE id = ?
             RETURNING id",
        )
        .bind(work_log_id)
        .bind(&unit.work_outcome)
        .bind(unit.work_type_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(EngineError::NotFound {
            entity: "work type",
            id: unit.work_type_id,
        })?;
    }

    load_work_log(conn, work_log_id).await
}

async fn mark_work_log_deleted(
    conn: &mut SqliteConnection,
    id: i64,
    operator_employee_id: i64,
) -> EngineResult<()> {
    let now = encode_timestamp(Utc::now());
    let deleted = sqlx::query(
        "UPDATE work_logs SET deleted_at = ?, deleted_by = ?
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&now)
    .bind(operator_employee_id)
    .bind(id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if deleted == 0 {
        return Err(EngineError::NotFound {
            entity: "work log",
            id,
        });
    }

    sqlx::query(
        "UPDATE work_log_units SET deleted_at = ?, deleted_by = ?
         WHERE work_log_id = ? AND deleted_at IS NULL",
    )
    .bind(&now)
    .bind(operator_employee_id)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl Database {
    /// Returns every work type, ordered by id.
    pub async fn list_work_types(&self) -> EngineResult<Vec<WorkType>> {
        sqlx::query_as::<_, WorkTypeRow>(
            "SELECT id, name, outcome_unit, multiplier, notes FROM work_types ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(WorkTypeRow::into_work_type)
        .collect()
    }

    /// Creates a work type.
    pub async fn create_work_type(
        &self,
        name: &str,
        outcome_unit: &str,
        multiplier: Decimal,
        notes: &str,
    ) -> EngineResult<WorkType> {
        let work_type = sqlx::query_as::<_, WorkTypeRow>(
            "INSERT INTO work_types (name, outcome_unit, multiplier, notes)
             VALUES (?, ?, ?, ?)
             RETURNING id, name, outcome_unit, multiplier, notes",
        )
        .bind(name)
        .bind(outcome_unit)
        .bind(multiplier.to_string())
        .bind(notes)
        .fetch_one(&self.pool)
        .await?
        .into_work_type()?;

        info!(work_type_id = work_type.id, "work type created");
        Ok(work_type)
    }

    /// Returns live work logs created from `from` to `to` inclusive, oldest
    /// first, optionally for one employee only. Each log carries its live
    /// units.
    ///
    /// Logs and units are read in one transaction, so a concurrent delete
    /// cannot leave a log without the units it had.
    pub async fn list_work_logs(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        employee_id: Option<i64>,
    ) -> EngineResult<Vec<WorkLog>> {
        let from = encode_timestamp(from);
        let to = encode_timestamp(to);
        let mut tx = self.pool.begin().await?;

        let logs = sqlx::query_as::<_, WorkLogRow>(
            "SELECT id, employee_id, patient_name, created_at FROM work_logs
             WHERE deleted_at IS NULL
               AND created_at >= ? AND created_at <= ?
               AND (? IS NULL OR employee_id = ?)
             ORDER BY created_at, id",
        )
        .bind(&from)
        .bind(&to)
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&mut *tx)
        .await?;

        let units = sqlx::query_as::<_, WorkLogUnitRow>(&format!(
            "{} WHERE u.deleted_at IS NULL AND l.deleted_at IS NULL
                AND l.created_at >= ? AND l.created_at <= ?
                AND (? IS NULL OR l.employee_id = ?)
             ORDER BY u.id",
            SELECT_UNITS
        ))
        .bind(&from)
        .bind(&to)
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        assemble(logs, units)
    }

    /// Returns a live work log, or `NotFound`.
    pub async fn get_work_log(&self, id: i64) -> EngineResult<WorkLog> {
        let mut conn = self.pool.acquire().await?;
        load_work_log(&mut conn, id).await
    }

    /// Creates a work log and its units atomically.
    ///
    /// Each unit captures its work type's current multiplier. An unknown
    /// employee or work type fails with `NotFound` and nothing is written.
    pub async fn create_work_log(
        &self,
        request: &CreateWorkLogRequest,
        created_at: DateTime<Utc>,
    ) -> EngineResult<WorkLog> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = insert_work_log(tx.conn()?, request, created_at).await;
        let work_log = tx.finish(result).await?;

        info!(
            work_log_id = work_log.id,
            employee_id = request.employee_id,
            units = work_log.units.len(),
            "work log created"
        );
        Ok(work_log)
    }

    /// Marks a live work log and its units deleted by `operator_employee_id`.
    pub async fn delete_work_log(&self, id: i64, operator_employee_id: i64) -> EngineResult<()> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = mark_work_log_deleted(tx.conn()?, id, operator_employee_id).await;
        tx.finish(result).await?;

        info!(work_log_id = id, operator = operator_employee_id, "work log deleted");
        Ok(())
    }
}
