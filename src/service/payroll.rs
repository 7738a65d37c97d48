//! The payroll service.
//!
//! Validates requests, bounds every operation by the request timeout and
//! orchestrates the store and the salary calculator. The HTTP layer talks
//! only to this type.

use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use super::SalaryCalculator;
use crate::calculation::{create_employee_summaries, list_at_date};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AdditionalComponent, Attendance, AttendanceType, Calendar, CreateAttendanceTypeRequest,
    CreateComponentRequest, CreateEmployeeRequest, CreateExtraInfoRequest, CreateSnapshotRequest,
    CreateWorkLogRequest, CreateWorkTypeRequest, Employee, ExtraInfo, Month, MonthlyAttendance,
    Salary, Snapshot, StaticComponent, UpdateShiftFeeRequest, UpsertAttendanceRequest, WorkLog,
    WorkType,
};
use crate::store::Database;
use crate::validation::Validator;

/// Default bound on a single operation.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point for every payroll operation.
#[derive(Debug, Clone)]
pub struct PayrollService {
    db: Database,
    calculator: SalaryCalculator<Database>,
    timeout: Duration,
}

impl PayrollService {
    /// Creates a service over the store, resolving days in `calendar`.
    pub fn new(db: Database, calendar: Calendar, timeout: Duration) -> Self {
        Self {
            calculator: SalaryCalculator::new(db.clone(), calendar),
            db,
            timeout,
        }
    }

    /// The organization calendar.
    pub fn calendar(&self) -> Calendar {
        self.calculator.calendar()
    }

    /// Runs `future` under the request timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        future: impl Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "operation timed out");
                Err(EngineError::Timeout {
                    operation: operation.to_string(),
                })
            }
        }
    }

    /// Checks the store is reachable.
    pub async fn health(&self) -> EngineResult<()> {
        self.bounded("health check", self.db.ping()).await
    }

    // Employees

    /// Returns every employee.
    pub async fn list_employees(&self) -> EngineResult<Vec<Employee>> {
        self.bounded("list employees", self.db.list_employees()).await
    }

    /// Returns one employee.
    pub async fn get_employee(&self, id: i64) -> EngineResult<Employee> {
        self.bounded("get employee", self.db.get_employee(id)).await
    }

    /// Adds an employee.
    pub async fn create_employee(&self, request: CreateEmployeeRequest) -> EngineResult<Employee> {
        request.validate()?;
        self.bounded(
            "create employee",
            self.db.create_employee(request.name.trim(), request.shift_fee),
        )
        .await
    }

    /// Changes an employee's shift fee.
    pub async fn update_shift_fee(
        &self,
        id: i64,
        request: UpdateShiftFeeRequest,
    ) -> EngineResult<Employee> {
        request.validate()?;
        self.bounded("update shift fee", self.db.update_shift_fee(id, request.shift_fee))
            .await
    }

    // Work types and work logs

    /// Returns every work type.
    pub async fn list_work_types(&self) -> EngineResult<Vec<WorkType>> {
        self.bounded("list work types", self.db.list_work_types()).await
    }

    /// Creates a work type.
    pub async fn create_work_type(&self, request: CreateWorkTypeRequest) -> EngineResult<WorkType> {
        request.validate()?;
        self.bounded(
            "create work type",
            self.db.create_work_type(
                request.name.trim(),
                &request.outcome_unit,
                request.multiplier,
                &request.notes,
            ),
        )
        .await
    }

    /// Returns live work logs created on local days `from` through `to`.
    pub async fn list_work_logs(&self, from: NaiveDate, to: NaiveDate) -> EngineResult<Vec<WorkLog>> {
        let (time_from, time_to) = self.calendar().days_window(from, to);
        self.bounded("list work logs", self.db.list_work_logs(time_from, time_to, None))
            .await
    }

    /// Returns one live work log.
    pub async fn get_work_log(&self, id: i64) -> EngineResult<WorkLog> {
        self.bounded("get work log", self.db.get_work_log(id)).await
    }

    /// Creates a work log with its units, timestamped now.
    pub async fn create_work_log(&self, request: CreateWorkLogRequest) -> EngineResult<WorkLog> {
        request.validate()?;
        self.bounded("create work log", self.db.create_work_log(&request, Utc::now()))
            .await
    }

    /// Soft-deletes a work log on behalf of an operator.
    pub async fn delete_work_log(&self, id: i64, operator_employee_id: i64) -> EngineResult<()> {
        Validator::new()
            .id("operatorEmployeeID", operator_employee_id)
            .finish()?;
        self.bounded(
            "delete work log",
            self.db.delete_work_log(id, operator_employee_id),
        )
        .await
    }

    // Attendance

    /// Returns every attendance type.
    pub async fn list_attendance_types(&self) -> EngineResult<Vec<AttendanceType>> {
        self.bounded("list attendance types", self.db.list_attendance_types())
            .await
    }

    /// Creates an attendance type.
    pub async fn create_attendance_type(
        &self,
        request: CreateAttendanceTypeRequest,
    ) -> EngineResult<AttendanceType> {
        let payable_type = request.validate()?;
        self.bounded(
            "create attendance type",
            self.db.create_attendance_type(request.name.trim(), payable_type),
        )
        .await
    }

    /// Records an attendance, replacing any existing one for the same
    /// employee and date.
    pub async fn upsert_attendance(&self, request: UpsertAttendanceRequest) -> EngineResult<Attendance> {
        request.validate()?;
        self.bounded("upsert attendance", self.db.upsert_attendance(&request))
            .await
    }

    /// Returns the month's attendance of every employee, per day and
    /// summarized per employee.
    pub async fn get_monthly_attendance(&self, month: Month) -> EngineResult<MonthlyAttendance> {
        let (from, to) = month.date_range();
        let attendances = self
            .bounded("list attendances", self.db.list_attendances(from, to, None))
            .await?;

        Ok(MonthlyAttendance {
            daily_attendances: list_at_date(&attendances, from, to),
            employee_summaries: create_employee_summaries(&attendances),
        })
    }

    // Salary

    /// Computes an employee's salary for a month.
    pub async fn get_salary(&self, employee_id: i64, month: Month) -> EngineResult<Salary> {
        self.bounded("get salary", self.calculator.get_salary(employee_id, month))
            .await
    }

    /// Returns the employee's static components.
    pub async fn list_static_components(&self, employee_id: i64) -> EngineResult<Vec<StaticComponent>> {
        self.bounded(
            "list static components",
            self.db.list_static_components(employee_id),
        )
        .await
    }

    /// Adds a static component.
    pub async fn create_static_component(
        &self,
        employee_id: i64,
        request: CreateComponentRequest,
    ) -> EngineResult<StaticComponent> {
        request.validate()?;
        self.bounded(
            "create static component",
            self.db
                .create_static_component(employee_id, &request.to_component()),
        )
        .await
    }

    /// Removes the employee's static component.
    pub async fn delete_static_component(&self, employee_id: i64, id: i64) -> EngineResult<()> {
        self.bounded(
            "delete static component",
            self.db.delete_static_component(employee_id, id),
        )
        .await
    }

    /// Returns the employee's additional components for the month.
    pub async fn list_additional_components(
        &self,
        employee_id: i64,
        month: Month,
    ) -> EngineResult<Vec<AdditionalComponent>> {
        self.bounded(
            "list additional components",
            self.db.list_additional_components(employee_id, month),
        )
        .await
    }

    /// Adds a one-off component to the employee's month.
    pub async fn create_additional_component(
        &self,
        employee_id: i64,
        month: Month,
        request: CreateComponentRequest,
    ) -> EngineResult<AdditionalComponent> {
        request.validate()?;
        self.bounded(
            "create additional component",
            self.db
                .create_additional_component(employee_id, month, &request.to_component()),
        )
        .await
    }

    /// Removes the additional component if it belongs to the employee and
    /// month.
    pub async fn delete_additional_component(
        &self,
        employee_id: i64,
        month: Month,
        id: i64,
    ) -> EngineResult<()> {
        self.bounded(
            "delete additional component",
            self.db.delete_additional_component(employee_id, month, id),
        )
        .await
    }

    /// Returns the employee's notes for the month.
    pub async fn list_extra_infos(&self, employee_id: i64, month: Month) -> EngineResult<Vec<ExtraInfo>> {
        self.bounded("list extra infos", self.db.list_extra_infos(employee_id, month))
            .await
    }

    /// Attaches a note to the employee's month.
    pub async fn create_extra_info(
        &self,
        employee_id: i64,
        month: Month,
        request: CreateExtraInfoRequest,
    ) -> EngineResult<ExtraInfo> {
        request.validate()?;
        self.bounded(
            "create extra info",
            self.db.create_extra_info(
                employee_id,
                month,
                request.title.trim(),
                &request.description,
            ),
        )
        .await
    }

    /// Removes the note if it belongs to the employee and month.
    pub async fn delete_extra_info(&self, employee_id: i64, month: Month, id: i64) -> EngineResult<()> {
        self.bounded(
            "delete extra info",
            self.db.delete_extra_info(employee_id, month, id),
        )
        .await
    }

    // Snapshots

    /// Computes the salary and stores it as a new snapshot.
    pub async fn create_snapshot(&self, request: CreateSnapshotRequest) -> EngineResult<Snapshot> {
        let month = request.validate()?;
        let employee_id = request.employee_id;

        self.bounded("create snapshot", async {
            let salary = self
                .calculator
                .get_salary(employee_id, month)
                .await
                .map_err(|e| e.context("get salary"))?;
            self.db.create_snapshot(employee_id, month, &salary).await
        })
        .await
        .inspect(|snapshot| {
            info!(
                snapshot_id = snapshot.id,
                employee_id,
                month = %month,
                total = %snapshot.salary.total(),
                "salary captured"
            )
        })
    }

    /// Returns live snapshots, newest first.
    pub async fn list_snapshots(
        &self,
        employee_id: Option<i64>,
        month: Option<Month>,
    ) -> EngineResult<Vec<Snapshot>> {
        self.bounded("list snapshots", self.db.list_snapshots(employee_id, month))
            .await
    }

    /// Returns one live snapshot.
    pub async fn get_snapshot(&self, id: i64) -> EngineResult<Snapshot> {
        self.bounded("get snapshot", self.db.get_snapshot(id)).await
    }

    /// Soft-deletes a snapshot.
    pub async fn delete_snapshot(&self, id: i64) -> EngineResult<()> {
        self.bounded("delete snapshot", self.db.delete_snapshot(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateWorkLogUnitRequest, PayableType};
    use chrono::{FixedOffset, TimeZone};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn january() -> Month {
        Month::new(2025, 1).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    async fn service() -> PayrollService {
        let db = Database::memory().await.unwrap();
        let calendar = Calendar::new(FixedOffset::east_opt(7 * 3600).unwrap());
        PayrollService::new(db, calendar, DEFAULT_REQUEST_TIMEOUT)
    }

    async fn employee(service: &PayrollService, shift_fee: &str) -> Employee {
        service
            .create_employee(CreateEmployeeRequest {
                name: "Ani".to_string(),
                shift_fee: dec(shift_fee),
            })
            .await
            .unwrap()
    }

    fn bonus(amount: &str) -> CreateComponentRequest {
        CreateComponentRequest {
            description: "Bonus".to_string(),
            amount: dec(amount),
            multiplier: Decimal::ONE,
        }
    }

    /// Seeds the full-month example: 20 working days, 2 Cuti days,
    /// 5 overtime hours, one work log with units 3 and 2, a 50000 bonus.
    async fn seed_month(service: &PayrollService, employee_id: i64) {
        let masuk = service
            .create_attendance_type(CreateAttendanceTypeRequest {
                name: "Masuk".to_string(),
                payable_type: "working".to_string(),
            })
            .await
            .unwrap();
        let cuti = service
            .create_attendance_type(CreateAttendanceTypeRequest {
                name: "Cuti".to_string(),
                payable_type: "benefit".to_string(),
            })
            .await
            .unwrap();

        for day in 1..=22 {
            let (type_id, overtime) = match day {
                1..=5 => (masuk.id, "1"),
                6..=20 => (masuk.id, "0"),
                _ => (cuti.id, "0"),
            };
            service
                .upsert_attendance(UpsertAttendanceRequest {
                    employee_id,
                    date: date(day),
                    type_id,
                    overtime_hours: dec(overtime),
                    operator_employee_id: employee_id,
                })
                .await
                .unwrap();
        }

        let tes = service
            .create_work_type(CreateWorkTypeRequest {
                name: "Cek Gula Darah".to_string(),
                outcome_unit: "mg/dL".to_string(),
                multiplier: dec("3"),
                notes: String::new(),
            })
            .await
            .unwrap();
        let resep = service
            .create_work_type(CreateWorkTypeRequest {
                name: "Resep".to_string(),
                outcome_unit: "lembar".to_string(),
                multiplier: dec("2"),
                notes: String::new(),
            })
            .await
            .unwrap();
        let units = [tes.id, resep.id]
            .into_iter()
            .map(|work_type_id| CreateWorkLogUnitRequest {
                work_type_id,
                work_outcome: "selesai".to_string(),
            })
            .collect();
        service
            .db
            .create_work_log(
                &CreateWorkLogRequest {
                    employee_id,
                    patient_name: "Pak Joko".to_string(),
                    units,
                },
                Utc.with_ymd_and_hms(2025, 1, 10, 3, 0, 0).unwrap(),
            )
            .await
            .unwrap();

        service
            .create_additional_component(employee_id, january(), bonus("50000"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_salary_end_to_end() {
        let service = service().await;
        let ani = employee(&service, "100000").await;
        seed_month(&service, ani.id).await;

        let salary = service.get_salary(ani.id, january()).await.unwrap();
        assert_eq!(salary.total(), dec("2383575"));
        assert_eq!(salary.components.len(), 5);
        assert_eq!(salary.components[2].description, "Cuti");
    }

    #[tokio::test]
    async fn test_salary_for_missing_employee_is_not_found() {
        let service = service().await;
        let err = service.get_salary(99, january()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_snapshot_survives_later_changes() {
        let service = service().await;
        let ani = employee(&service, "100000").await;
        seed_month(&service, ani.id).await;

        let snapshot = service
            .create_snapshot(CreateSnapshotRequest {
                employee_id: ani.id,
                month: "2025-01".to_string(),
            })
            .await
            .unwrap();

        service
            .update_shift_fee(ani.id, UpdateShiftFeeRequest { shift_fee: dec("150000") })
            .await
            .unwrap();
        service
            .create_additional_component(ani.id, january(), bonus("999"))
            .await
            .unwrap();

        let fetched = service.get_snapshot(snapshot.id).await.unwrap();
        assert_eq!(fetched.salary, snapshot.salary);
        assert_eq!(fetched.salary.total(), dec("2383575"));
        assert_ne!(service.get_salary(ani.id, january()).await.unwrap().total(), dec("2383575"));
    }

    #[tokio::test]
    async fn test_snapshot_of_missing_employee_stores_nothing() {
        let service = service().await;
        let err = service
            .create_snapshot(CreateSnapshotRequest {
                employee_id: 5,
                month: "2025-01".to_string(),
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(service.list_snapshots(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_request_is_validated() {
        let service = service().await;
        let err = service
            .create_snapshot(CreateSnapshotRequest {
                employee_id: 1,
                month: "2025-13".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref e) if e.has_field("month")));
    }

    #[tokio::test]
    async fn test_invalid_requests_never_reach_store() {
        let service = service().await;

        let err = service
            .create_employee(CreateEmployeeRequest {
                name: String::new(),
                shift_fee: Decimal::ZERO,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = service
            .create_attendance_type(CreateAttendanceTypeRequest {
                name: "Libur".to_string(),
                payable_type: "holiday".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref e) if e.has_field("payableType")));

        assert!(service.list_employees().await.unwrap().is_empty());
        assert!(service.list_attendance_types().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let service = service().await;
        let ani = employee(&service, "100000").await;
        let masuk = service
            .create_attendance_type(CreateAttendanceTypeRequest {
                name: "Masuk".to_string(),
                payable_type: PayableType::Working.to_string(),
            })
            .await
            .unwrap();

        for overtime in ["1", "2"] {
            service
                .upsert_attendance(UpsertAttendanceRequest {
                    employee_id: ani.id,
                    date: date(3),
                    type_id: masuk.id,
                    overtime_hours: dec(overtime),
                    operator_employee_id: ani.id,
                })
                .await
                .unwrap();
        }

        let month = service.get_monthly_attendance(january()).await.unwrap();
        assert_eq!(month.daily_attendances.len(), 31);
        assert_eq!(month.daily_attendances[2].attendances.len(), 1);
        assert_eq!(month.employee_summaries.len(), 1);
        assert_eq!(month.employee_summaries[0].overtime_hours, dec("2"));
    }

    #[tokio::test]
    async fn test_wrong_scope_delete_keeps_component() {
        let service = service().await;
        let ani = employee(&service, "100000").await;
        let component = service
            .create_additional_component(ani.id, january(), bonus("50000"))
            .await
            .unwrap();

        let february = Month::new(2025, 2).unwrap();
        assert!(service
            .delete_additional_component(ani.id, february, component.id)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(service
            .delete_additional_component(ani.id + 1, january(), component.id)
            .await
            .unwrap_err()
            .is_not_found());

        let salary = service.get_salary(ani.id, january()).await.unwrap();
        assert_eq!(salary.total(), dec("50000"));
    }

    #[tokio::test]
    async fn test_work_logs_listed_by_local_day() {
        let service = service().await;
        let ani = employee(&service, "100000").await;
        seed_month(&service, ani.id).await;

        // Created 10:00 local on 10 January.
        assert_eq!(service.list_work_logs(date(10), date(10)).await.unwrap().len(), 1);
        assert!(service.list_work_logs(date(11), date(31)).await.unwrap().is_empty());
        assert_eq!(service.list_work_logs(date(31), date(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_work_log_requires_operator() {
        let service = service().await;
        let err = service.delete_work_log(1, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref e) if e.has_field("operatorEmployeeID")));
    }

    #[tokio::test]
    async fn test_deleted_work_log_leaves_salary() {
        let service = service().await;
        let ani = employee(&service, "100000").await;
        seed_month(&service, ani.id).await;

        let log = service.list_work_logs(date(1), date(31)).await.unwrap().remove(0);
        service.delete_work_log(log.id, ani.id).await.unwrap();

        let salary = service.get_salary(ani.id, january()).await.unwrap();
        assert_eq!(salary.total(), dec("2378575"));
    }

    #[tokio::test]
    async fn test_operations_are_bounded_by_timeout() {
        let db = Database::memory().await.unwrap();
        let service = PayrollService::new(db, Calendar::utc(), Duration::from_millis(1));

        let err = service
            .bounded("stall", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Timeout { operation } if operation == "stall"));
    }
}
