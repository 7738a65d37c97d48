//! Attendance ledger persistence.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::info;

use super::{Database, WriteTransaction, decode_decimal, encode_timestamp, ensure_employee};
use crate::error::{EngineError, EngineResult};
use crate::models::{Attendance, AttendanceType, PayableType, UpsertAttendanceRequest};

const SELECT_ATTENDANCE: &str = "
    SELECT a.id, a.employee_id, a.date, a.overtime_hours, a.created_at, a.updated_at,
           a.last_operator_employee_id,
           t.id AS type_id, t.name AS type_name, t.payable_type AS type_payable_type,
           t.created_at AS type_created_at, t.updated_at AS type_updated_at
    FROM attendances a
    JOIN attendance_types t ON t.id = a.type_id";

#[derive(Debug, FromRow)]
struct AttendanceTypeRow {
    id: i64,
    name: String,
    payable_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AttendanceTypeRow {
    fn into_attendance_type(self) -> EngineResult<AttendanceType> {
        Ok(AttendanceType {
            payable_type: decode_payable_type(self.id, &self.payable_type)?,
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AttendanceRow {
    id: i64,
    employee_id: i64,
    date: NaiveDate,
    overtime_hours: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_operator_employee_id: i64,
    type_id: i64,
    type_name: String,
    type_payable_type: String,
    type_created_at: DateTime<Utc>,
    type_updated_at: DateTime<Utc>,
}

impl AttendanceRow {
    fn into_attendance(self) -> EngineResult<Attendance> {
        Ok(Attendance {
            overtime_hours: decode_decimal("attendance", self.id, "overtime_hours", &self.overtime_hours)?,
            attendance_type: AttendanceTypeRow {
                id: self.type_id,
                name: self.type_name,
                payable_type: self.type_payable_type,
                created_at: self.type_created_at,
                updated_at: self.type_updated_at,
            }
            .into_attendance_type()?,
            id: self.id,
            employee_id: self.employee_id,
            date: self.date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_operator_employee_id: self.last_operator_employee_id,
        })
    }
}

fn decode_payable_type(id: i64, value: &str) -> EngineResult<PayableType> {
    value
        .parse()
        .map_err(|message| EngineError::CorruptRecord {
            entity: "attendance type",
            id,
            message,
        })
}

async fn load_attendance(
    conn: &mut SqliteConnection,
    employee_id: i64,
    date: NaiveDate,
) -> EngineResult<Option<Attendance>> {
    sqlx::query_as::<_, AttendanceRow>(&format!(
        "{} WHERE a.employee_id = ? AND a.date = ?",
        SELECT_ATTENDANCE
    ))
    .bind(employee_id)
    .bind(date)
    .fetch_optional(conn)
    .await?
    .map(AttendanceRow::into_attendance)
    .transpose()
}

async fn upsert_attendance_row(
    conn: &mut SqliteConnection,
    request: &UpsertAttendanceRequest,
) -> EngineResult<Attendance> {
    ensure_employee(conn, request.employee_id).await?;
    sqlx::query_scalar::<_, i64>("SELECT id FROM attendance_types WHERE id = ?")
        .bind(request.type_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(EngineError::NotFound {
            entity: "attendance type",
            id: request.type_id,
        })?;

    let now = encode_timestamp(Utc::now());
    sqlx::query(
        "INSERT INTO attendances
            (employee_id, date, type_id, overtime_hours, created_at, updated_at, last_operator_employee_id)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (employee_id, date) DO UPDATE SET
            type_id = excluded.type_id,
            overtime_hours = excluded.overtime_hours,
            updated_at = excluded.updated_at,
            last_operator_employee_id = excluded.last_operator_employee_id",
    )
    .bind(request.employee_id)
    .bind(request.date)
    .bind(request.type_id)
    .bind(request.overtime_hours.to_string())
    .bind(&now)
    .bind(&now)
    .bind(request.operator_employee_id)
    .execute(&mut *conn)
    .await?;

    load_attendance(conn, request.employee_id, request.date)
        .await?
        .ok_or(EngineError::NotFound {
            entity: "attendance",
            id: request.employee_id,
        })
}

impl Database {
    /// Returns every attendance type, ordered by id.
    pub async fn list_attendance_types(&self) -> EngineResult<Vec<AttendanceType>> {
        sqlx::query_as::<_, AttendanceTypeRow>(
            "SELECT id, name, payable_type, created_at, updated_at FROM attendance_types ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttendanceTypeRow::into_attendance_type)
        .collect()
    }

    /// Creates an attendance type.
    pub async fn create_attendance_type(
        &self,
        name: &str,
        payable_type: PayableType,
    ) -> EngineResult<AttendanceType> {
        let now = encode_timestamp(Utc::now());
        let attendance_type = sqlx::query_as::<_, AttendanceTypeRow>(
            "INSERT INTO attendance_types (name, payable_type, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, name, payable_type, created_at, updated_at",
        )
        .bind(name)
        .bind(payable_type.as_str())
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?
        .into_attendance_type()?;

        info!(type_id = attendance_type.id, payable_type = %payable_type, "attendance type created");
        Ok(attendance_type)
    }

    /// Returns attendance from `from` to `to` inclusive, ordered by date
    /// then employee, optionally for one employee only.
    pub async fn list_attendances(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        employee_id: Option<i64>,
    ) -> EngineResult<Vec<Attendance>> {
        sqlx::query_as::<_, AttendanceRow>(&format!(
            "{} WHERE a.date BETWEEN ? AND ? AND (? IS NULL OR a.employee_id = ?)
             ORDER BY a.date, a.employee_id",
            SELECT_ATTENDANCE
        ))
        .bind(from)
        .bind(to)
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AttendanceRow::into_attendance)
        .collect()
    }

    /// Records the attendance for an (employee, date) pair, overwriting the
    /// type, overtime and operator of an existing row.
    ///
    /// The write and the read of the resulting row happen in one
    /// transaction.
    pub async fn upsert_attendance(&self, request: &UpsertAttendanceRequest) -> EngineResult<Attendance> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = upsert_attendance_row(tx.conn()?, request).await;
        let attendance = tx.finish(result).await?;

        info!(
            employee_id = request.employee_id,
            date = %request.date,
            type_id = request.type_id,
            operator = request.operator_employee_id,
            "attendance recorded"
        );
        Ok(attendance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn request(employee_id: i64, day: u32, type_id: i64, overtime: &str) -> UpsertAttendanceRequest {
        UpsertAttendanceRequest {
            employee_id,
            date: date(day),
            type_id,
            overtime_hours: dec(overtime),
            operator_employee_id: employee_id,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_types() {
        let db = testing::db().await;
        db.create_attendance_type("Masuk", PayableType::Working).await.unwrap();
        db.create_attendance_type("Cuti", PayableType::Benefit).await.unwrap();

        let types = db.list_attendance_types().await.unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(types[1].name, "Cuti");
        assert_eq!(types[1].payable_type, PayableType::Benefit);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_overwrites() {
        let db = testing::db().await;
        let employee = testing::employee(&db, "Ani", "100000").await;
        let masuk = db.create_attendance_type("Masuk", PayableType::Working).await.unwrap();
        let sakit = db.create_attendance_type("Sakit", PayableType::Benefit).await.unwrap();

        let first = db.upsert_attendance(&request(employee.id, 2, masuk.id, "1.5")).await.unwrap();
        assert_eq!(first.attendance_type.name, "Masuk");
        assert_eq!(first.overtime_hours, dec("1.5"));

        let mut overwrite = request(employee.id, 2, sakit.id, "0");
        overwrite.operator_employee_id = 99;
        let second = db.upsert_attendance(&overwrite).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.attendance_type.id, sakit.id);
        assert_eq!(second.overtime_hours, Decimal::ZERO);
        assert_eq!(second.last_operator_employee_id, 99);
        assert_eq!(second.created_at, first.created_at);

        let rows = db.list_attendances(date(1), date(31), Some(employee.id)).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_for_one_day_all_succeed() {
        let (_dir, db) = testing::file_db(8).await;
        let employee = testing::employee(&db, "Ani", "100000").await;
        let masuk = db.create_attendance_type("Masuk", PayableType::Working).await.unwrap();

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let db = db.clone();
                let mut request = request(employee.id, 2, masuk.id, "0");
                request.overtime_hours = Decimal::from(i);
                tokio::spawn(async move { db.upsert_attendance(&request).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let rows = db.list_attendances(date(1), date(31), Some(employee.id)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].overtime_hours < Decimal::from(16));
    }

    #[tokio::test]
    async fn test_upsert_unknown_type_is_not_found() {
        let db = testing::db().await;
        let employee = testing::employee(&db, "Ani", "100000").await;

        let err = db.upsert_attendance(&request(employee.id, 2, 77, "0")).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "attendance type", id: 77 }));
        assert!(db.list_attendances(date(1), date(31), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_unknown_employee_is_not_found() {
        let db = testing::db().await;
        let masuk = db.create_attendance_type("Masuk", PayableType::Working).await.unwrap();

        let err = db.upsert_attendance(&request(5, 2, masuk.id, "0")).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "employee", id: 5 }));
    }

    #[tokio::test]
    async fn test_list_is_inclusive_and_filters_employee() {
        let db = testing::db().await;
        let ani = testing::employee(&db, "Ani", "100000").await;
        let budi = testing::employee(&db, "Budi", "90000").await;
        let masuk = db.create_attendance_type("Masuk", PayableType::Working).await.unwrap();

        for day in [1, 15, 31] {
            db.upsert_attendance(&request(ani.id, day, masuk.id, "0")).await.unwrap();
        }
        db.upsert_attendance(&request(budi.id, 15, masuk.id, "0")).await.unwrap();

        let ani_rows = db.list_attendances(date(1), date(31), Some(ani.id)).await.unwrap();
        assert_eq!(ani_rows.len(), 3);
        assert_eq!(ani_rows[0].date, date(1));
        assert_eq!(ani_rows[2].date, date(31));

        let middle = db.list_attendances(date(2), date(30), None).await.unwrap();
        assert_eq!(middle.len(), 2);
        assert_eq!(middle[0].employee_id, ani.id);
        assert_eq!(middle[1].employee_id, budi.id);
    }
}
