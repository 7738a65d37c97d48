//! The salary calculator.
//!
//! Gathers everything one employee's monthly salary depends on, then hands
//! it to the pure formula in [`crate::calculation`].

use tracing::debug;

use crate::calculation::{SalaryInputs, calculate_salary, create_employee_summary, total_work_units};
use crate::error::EngineResult;
use crate::models::{Calendar, Month, Salary};
use crate::store::SalarySource;

/// Computes salaries from a [`SalarySource`].
///
/// Day and month boundaries come from the calendar, never from the
/// process time zone.
#[derive(Debug, Clone)]
pub struct SalaryCalculator<S> {
    source: S,
    calendar: Calendar,
}

impl<S: SalarySource> SalaryCalculator<S> {
    /// Creates a calculator reading from `source`.
    pub fn new(source: S, calendar: Calendar) -> Self {
        Self { source, calendar }
    }

    /// The calendar month boundaries are resolved in.
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Computes the salary of an employee for a month.
    ///
    /// The employee, attendance, work logs, additional components and extra
    /// infos are fetched concurrently. The first failing fetch cancels the
    /// others and is returned wrapped with the name of the fetch; no
    /// partial salary is produced.
    pub async fn get_salary(&self, employee_id: i64, month: Month) -> EngineResult<Salary> {
        let (date_from, date_to) = month.date_range();
        let (time_from, time_to) = self.calendar.month_window(month);

        debug!(
            employee_id,
            month = %month,
            from = %time_from,
            to = %time_to,
            "fetching salary inputs"
        );

        let (employee, attendances, work_logs, additional_components, extra_infos) = tokio::try_join!(
            async {
                self.source
                    .get_employee(employee_id)
                    .await
                    .map_err(|e| e.context("get employee"))
            },
            async {
                self.source
                    .get_attendances_between(employee_id, date_from, date_to)
                    .await
                    .map_err(|e| e.context("get attendances"))
            },
            async {
                self.source
                    .get_work_logs_between(employee_id, time_from, time_to)
                    .await
                    .map_err(|e| e.context("get work logs"))
            },
            async {
                self.source
                    .get_additional_components(employee_id, month)
                    .await
                    .map_err(|e| e.context("get additional components"))
            },
            async {
                self.source
                    .get_extra_infos(employee_id, month)
                    .await
                    .map_err(|e| e.context("get extra infos"))
            },
        )?;

        Ok(calculate_salary(SalaryInputs {
            employee,
            attendance: create_employee_summary(&attendances),
            total_work_units: total_work_units(&work_logs),
            additional_components,
            extra_infos,
        }))
    }
}

impl<S> SalaryCalculator<S> {
    /// The source the calculator reads from.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::{
        AdditionalComponent, Attendance, AttendanceType, Employee, ExtraInfo, PayableType, WorkLog,
        WorkLogUnit, WorkType,
    };
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::time::Duration;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn january() -> Month {
        Month::new(2025, 1).unwrap()
    }

    fn wib() -> Calendar {
        Calendar::new(FixedOffset::east_opt(7 * 3600).unwrap())
    }

    /// An in-memory source that records the windows it was asked for.
    #[derive(Default)]
    struct FakeSource {
        employee: Option<Employee>,
        attendances: Vec<Attendance>,
        work_logs: Vec<WorkLog>,
        additional: Vec<AdditionalComponent>,
        extra_infos: Vec<ExtraInfo>,
        fail_work_logs: bool,
        slow_attendance: bool,
        work_log_window: Mutex<Option<(DateTime<Utc>, DateTime<Utc>)>>,
        attendance_range: Mutex<Option<(NaiveDate, NaiveDate)>>,
    }

    impl SalarySource for FakeSource {
        async fn get_employee(&self, id: i64) -> EngineResult<Employee> {
            self.employee
                .clone()
                .filter(|e| e.id == id)
                .ok_or(EngineError::NotFound {
                    entity: "employee",
                    id,
                })
        }

        async fn get_attendances_between(
            &self,
            employee_id: i64,
            from: NaiveDate,
            to: NaiveDate,
        ) -> EngineResult<Vec<Attendance>> {
            *self.attendance_range.lock().unwrap() = Some((from, to));
            if self.slow_attendance {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(self
                .attendances
                .iter()
                .filter(|a| a.employee_id == employee_id && a.date >= from && a.date <= to)
                .cloned()
                .collect())
        }

        async fn get_work_logs_between(
            &self,
            employee_id: i64,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> EngineResult<Vec<WorkLog>> {
            *self.work_log_window.lock().unwrap() = Some((from, to));
            if self.fail_work_logs {
                return Err(EngineError::Timeout {
                    operation: "work log query".to_string(),
                });
            }
            Ok(self
                .work_logs
                .iter()
                .filter(|l| l.employee_id == employee_id && l.created_at >= from && l.created_at <= to)
                .cloned()
                .collect())
        }

        async fn get_additional_components(
            &self,
            employee_id: i64,
            month: Month,
        ) -> EngineResult<Vec<AdditionalComponent>> {
            Ok(self
                .additional
                .iter()
                .filter(|c| c.employee_id == employee_id && c.month == month)
                .cloned()
                .collect())
        }

        async fn get_extra_infos(&self, employee_id: i64, month: Month) -> EngineResult<Vec<ExtraInfo>> {
            Ok(self
                .extra_infos
                .iter()
                .filter(|i| i.employee_id == employee_id && i.month == month)
                .cloned()
                .collect())
        }
    }

    fn attendance_type(name: &str, payable_type: PayableType) -> AttendanceType {
        AttendanceType {
            id: 1,
            name: name.to_string(),
            payable_type,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn attendance(day: u32, attendance_type: &AttendanceType, overtime: &str) -> Attendance {
        Attendance {
            id: i64::from(day),
            employee_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            attendance_type: attendance_type.clone(),
            overtime_hours: dec(overtime),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_operator_employee_id: 1,
        }
    }

    fn work_log(created_at: DateTime<Utc>, multipliers: &[&str]) -> WorkLog {
        WorkLog {
            id: 1,
            employee_id: 1,
            patient_name: "Pak Joko".to_string(),
            created_at,
            units: multipliers
                .iter()
                .map(|m| WorkLogUnit {
                    id: 1,
                    work_type: WorkType {
                        id: 1,
                        name: "Tes".to_string(),
                        outcome_unit: String::new(),
                        multiplier: dec(m),
                        notes: String::new(),
                    },
                    work_outcome: "selesai".to_string(),
                    work_multiplier: dec(m),
                })
                .collect(),
        }
    }

    /// 20 working days, 2 Cuti days, 5 overtime hours, units 3 + 2 and a
    /// 50000 bonus on a 100000 shift fee.
    fn scenario() -> FakeSource {
        let masuk = attendance_type("Masuk", PayableType::Working);
        let cuti = attendance_type("Cuti", PayableType::Benefit);
        let libur = attendance_type("Libur", PayableType::None);

        let mut attendances: Vec<Attendance> = (1..=20)
            .map(|day| attendance(day, &masuk, if day <= 5 { "1" } else { "0" }))
            .collect();
        attendances.push(attendance(21, &cuti, "0"));
        attendances.push(attendance(22, &cuti, "0"));
        attendances.push(attendance(23, &libur, "0"));

        FakeSource {
            employee: Some(Employee {
                id: 1,
                name: "Ani".to_string(),
                shift_fee: dec("100000"),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }),
            attendances,
            work_logs: vec![work_log(Utc.with_ymd_and_hms(2025, 1, 10, 3, 0, 0).unwrap(), &["3", "2"])],
            additional: vec![AdditionalComponent {
                id: 1,
                employee_id: 1,
                month: january(),
                description: "Bonus".to_string(),
                amount: dec("50000"),
                multiplier: dec("1"),
                created_at: Utc::now(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_salary_for_full_month() {
        let calculator = SalaryCalculator::new(scenario(), wib());
        let salary = calculator.get_salary(1, january()).await.unwrap();

        let totals: Vec<Decimal> = salary.components.iter().map(|c| c.total()).collect();
        assert_eq!(
            totals,
            vec![dec("2000000"), dec("78575"), dec("200000"), dec("5000"), dec("50000")]
        );
        assert_eq!(salary.total(), dec("2383575"));
    }

    #[tokio::test]
    async fn test_salary_is_idempotent() {
        let calculator = SalaryCalculator::new(scenario(), wib());
        let first = calculator.get_salary(1, january()).await.unwrap();
        let second = calculator.get_salary(1, january()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_windows_follow_calendar_offset() {
        let calculator = SalaryCalculator::new(scenario(), wib());
        calculator.get_salary(1, january()).await.unwrap();

        let source = calculator.source();
        let (from, to) = source.work_log_window.lock().unwrap().unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 12, 31, 17, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2025, 1, 31, 16, 59, 59).unwrap() + chrono::Duration::nanoseconds(999_999_999));

        let (date_from, date_to) = source.attendance_range.lock().unwrap().unwrap();
        assert_eq!(date_from, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(date_to, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
    }

    #[tokio::test]
    async fn test_work_log_at_local_month_start_counts() {
        let mut source = scenario();
        // 00:30 on 1 February in UTC+7 belongs to February, not January.
        source.work_logs.push(work_log(Utc.with_ymd_and_hms(2025, 1, 31, 17, 30, 0).unwrap(), &["10"]));

        let salary = SalaryCalculator::new(source, wib()).get_salary(1, january()).await.unwrap();
        assert_eq!(salary.total(), dec("2383575"));
    }

    #[tokio::test]
    async fn test_missing_employee_is_wrapped_not_found() {
        let calculator = SalaryCalculator::new(scenario(), wib());
        let err = calculator.get_salary(2, january()).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("get employee: "));
    }

    #[tokio::test]
    async fn test_first_failure_cancels_slow_fetches() {
        let mut source = scenario();
        source.fail_work_logs = true;
        source.slow_attendance = true;

        let calculator = SalaryCalculator::new(source, wib());
        let err = calculator.get_salary(1, january()).await.unwrap_err();

        assert!(matches!(
            &err,
            EngineError::Dependency { context, .. } if context == "get work logs"
        ));
    }

    #[tokio::test]
    async fn test_extra_infos_ride_along() {
        let mut source = scenario();
        source.extra_infos.push(ExtraInfo {
            id: 1,
            employee_id: 1,
            month: january(),
            title: "Catatan".to_string(),
            description: "Kasbon lunas".to_string(),
            created_at: Utc::now(),
        });

        let salary = SalaryCalculator::new(source, wib()).get_salary(1, january()).await.unwrap();
        assert_eq!(salary.extra_infos.len(), 1);
        assert_eq!(salary.extra_infos[0].title, "Catatan");
    }
}
