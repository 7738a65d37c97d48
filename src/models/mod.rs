//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod calendar;
mod employee;
mod month;
mod salary;
mod work_log;

pub use attendance::{
    Attendance, AttendanceType, CreateAttendanceTypeRequest, DailyAttendances, EmployeeSummary,
    MonthlyAttendance, PayableType, UpsertAttendanceRequest,
};
pub use calendar::Calendar;
pub use employee::{CreateEmployeeRequest, Employee, UpdateShiftFeeRequest};
pub use month::{Month, MonthParseError};
pub use salary::{
    AdditionalComponent, Component, CreateComponentRequest, CreateExtraInfoRequest,
    CreateSnapshotRequest, DEBT_MARKER, ExtraInfo, Salary, Snapshot, SnapshotPayload,
    StaticComponent, round_up,
};
pub use work_log::{
    CreateWorkLogRequest, CreateWorkLogUnitRequest, CreateWorkTypeRequest, WorkLog, WorkLogUnit,
    WorkType,
};
