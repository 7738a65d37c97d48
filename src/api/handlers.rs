//! HTTP request handlers for the payroll API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, put},
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{
    CreateAttendanceTypeRequest, CreateComponentRequest, CreateEmployeeRequest,
    CreateExtraInfoRequest, CreateSnapshotRequest, CreateWorkLogRequest, CreateWorkTypeRequest,
    Month, UpdateShiftFeeRequest, UpsertAttendanceRequest,
};

use super::request::{MonthQuery, OperatorQuery, SnapshotsQuery, WorkLogsQuery};
use super::response::{ApiError, ApiErrorResponse, HealthResponse, MessageResponse};
use super::state::AppState;

type HandlerResult = Result<Response, ApiErrorResponse>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route("/employees/:id", get(get_employee))
        .route("/employees/:id/shift-fee", put(update_shift_fee))
        .route("/work-types", get(list_work_types).post(create_work_type))
        .route("/work-logs", get(list_work_logs).post(create_work_log))
        .route("/work-logs/:id", get(get_work_log).delete(delete_work_log))
        .route(
            "/attendance-types",
            get(list_attendance_types).post(create_attendance_type),
        )
        .route("/attendances", get(get_monthly_attendance))
        .route("/attendances/:employee_id/:date", put(upsert_attendance))
        .route("/salary/:month/:employee_id", get(get_salary))
        .route(
            "/salary/:month/:employee_id/additional-components",
            get(list_additional_components).post(create_additional_component),
        )
        .route(
            "/salary/:month/:employee_id/additional-components/:id",
            delete(delete_additional_component),
        )
        .route(
            "/salary/:month/:employee_id/extra-infos",
            get(list_extra_infos).post(create_extra_info),
        )
        .route(
            "/salary/:month/:employee_id/extra-infos/:id",
            delete(delete_extra_info),
        )
        .route(
            "/salary-static-components/:employee_id",
            get(list_static_components).post(create_static_component),
        )
        .route(
            "/salary-static-components/:employee_id/:id",
            delete(delete_static_component),
        )
        .route("/salary-snapshots", get(list_snapshots).post(create_snapshot))
        .route(
            "/salary-snapshots/:id",
            get(get_snapshot).delete(delete_snapshot),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}

/// Tracks one request from entry to response.
struct RequestLog {
    correlation_id: Uuid,
    operation: &'static str,
    started: Instant,
}

impl RequestLog {
    fn begin(operation: &'static str) -> Self {
        let correlation_id = Uuid::new_v4();
        info!(correlation_id = %correlation_id, operation, "Processing request");
        Self {
            correlation_id,
            operation,
            started: Instant::now(),
        }
    }

    /// Unwraps a JSON body, turning axum's rejection into an API error.
    fn body<T>(&self, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiErrorResponse> {
        let rejection = match payload {
            Ok(Json(body)) => return Ok(body),
            Err(rejection) => rejection,
        };
        let error = match rejection {
            JsonRejection::JsonDataError(err) => {
                let body_text = err.body_text();
                warn!(
                    correlation_id = %self.correlation_id,
                    error = %body_text,
                    "JSON data error"
                );
                if body_text.contains("missing field") {
                    ApiError::validation_error(body_text)
                } else {
                    ApiError::malformed_json(body_text)
                }
            }
            JsonRejection::JsonSyntaxError(err) => {
                warn!(
                    correlation_id = %self.correlation_id,
                    error = %err,
                    "JSON syntax error"
                );
                ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
            }
            _ => ApiError::malformed_json("Failed to parse request body"),
        };
        Err(ApiErrorResponse::bad_request(error))
    }

    /// Parses a `YYYY-MM` path segment.
    fn month(&self, value: &str) -> Result<Month, ApiErrorResponse> {
        Month::parse_field("month", value).map_err(|err| {
            warn!(
                correlation_id = %self.correlation_id,
                month = value,
                "Invalid month"
            );
            err.into()
        })
    }

    /// Logs the outcome and renders it with `status` on success.
    fn finish<T: Serialize>(self, status: StatusCode, result: EngineResult<T>) -> HandlerResult {
        let duration_us = self.started.elapsed().as_micros();
        match result {
            Ok(body) => {
                info!(
                    correlation_id = %self.correlation_id,
                    operation = self.operation,
                    duration_us,
                    "Request completed successfully"
                );
                Ok((status, Json(body)).into_response())
            }
            Err(err) => {
                warn!(
                    correlation_id = %self.correlation_id,
                    operation = self.operation,
                    duration_us,
                    error = %err,
                    "Request failed"
                );
                Err(err.into())
            }
        }
    }
}

/// Handler for GET /health.
async fn health(State(state): State<AppState>) -> HandlerResult {
    let log = RequestLog::begin("health");
    let result = state.service().health().await.map(|()| HealthResponse {
        status: "ok".to_string(),
        organization: state.organization().to_string(),
    });
    log.finish(StatusCode::OK, result)
}

async fn list_employees(State(state): State<AppState>) -> HandlerResult {
    let log = RequestLog::begin("list employees");
    let result = state.service().list_employees().await;
    log.finish(StatusCode::OK, result)
}

async fn get_employee(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    let log = RequestLog::begin("get employee");
    let result = state.service().get_employee(id).await;
    log.finish(StatusCode::OK, result)
}

async fn create_employee(
    State(state): State<AppState>,
    payload: Result<Json<CreateEmployeeRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create employee");
    let request = log.body(payload)?;
    let result = state.service().create_employee(request).await;
    log.finish(StatusCode::CREATED, result)
}

async fn update_shift_fee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateShiftFeeRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("update shift fee");
    let request = log.body(payload)?;
    let result = state.service().update_shift_fee(id, request).await;
    log.finish(StatusCode::OK, result)
}

async fn list_work_types(State(state): State<AppState>) -> HandlerResult {
    let log = RequestLog::begin("list work types");
    let result = state.service().list_work_types().await;
    log.finish(StatusCode::OK, result)
}

async fn create_work_type(
    State(state): State<AppState>,
    payload: Result<Json<CreateWorkTypeRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create work type");
    let request = log.body(payload)?;
    let result = state.service().create_work_type(request).await;
    log.finish(StatusCode::CREATED, result)
}

/// Handler for GET /work-logs.
///
/// Lists the work logs created on `?date=`, or from `?from=` through `?to=`,
/// in the organization calendar. Missing bounds mean today.
async fn list_work_logs(
    State(state): State<AppState>,
    Query(query): Query<WorkLogsQuery>,
) -> HandlerResult {
    let log = RequestLog::begin("list work logs");
    let (from, to) = query.span(&state.service().calendar());
    let result = state.service().list_work_logs(from, to).await;
    log.finish(StatusCode::OK, result)
}

async fn get_work_log(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    let log = RequestLog::begin("get work log");
    let result = state.service().get_work_log(id).await;
    log.finish(StatusCode::OK, result)
}

async fn create_work_log(
    State(state): State<AppState>,
    payload: Result<Json<CreateWorkLogRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create work log");
    let request = log.body(payload)?;
    let result = state.service().create_work_log(request).await;
    log.finish(StatusCode::CREATED, result)
}

async fn delete_work_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<OperatorQuery>,
) -> HandlerResult {
    let log = RequestLog::begin("delete work log");
    let result = state
        .service()
        .delete_work_log(id, query.operator_employee_id)
        .await
        .map(|()| MessageResponse::new("work log deleted"));
    log.finish(StatusCode::OK, result)
}

async fn list_attendance_types(State(state): State<AppState>) -> HandlerResult {
    let log = RequestLog::begin("list attendance types");
    let result = state.service().list_attendance_types().await;
    log.finish(StatusCode::OK, result)
}

async fn create_attendance_type(
    State(state): State<AppState>,
    payload: Result<Json<CreateAttendanceTypeRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create attendance type");
    let request = log.body(payload)?;
    let result = state.service().create_attendance_type(request).await;
    log.finish(StatusCode::CREATED, result)
}

/// Handler for GET /attendances?month=YYYY-MM.
async fn get_monthly_attendance(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> HandlerResult {
    let log = RequestLog::begin("get monthly attendance");
    let month = log.month(&query.month)?;
    let result = state.service().get_monthly_attendance(month).await;
    log.finish(StatusCode::OK, result)
}

/// Handler for PUT /attendances/:employee_id/:date.
///
/// The employee and date come from the path; the body carries the type,
/// overtime and operator.
async fn upsert_attendance(
    State(state): State<AppState>,
    Path((employee_id, date)): Path<(i64, NaiveDate)>,
    payload: Result<Json<UpsertAttendanceRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("upsert attendance");
    let mut request = log.body(payload)?;
    request.employee_id = employee_id;
    request.date = date;
    let result = state.service().upsert_attendance(request).await;
    log.finish(StatusCode::OK, result)
}

/// Handler for GET /salary/:month/:employee_id.
async fn get_salary(
    State(state): State<AppState>,
    Path((month, employee_id)): Path<(String, i64)>,
) -> HandlerResult {
    let log = RequestLog::begin("get salary");
    let month = log.month(&month)?;
    let result = state.service().get_salary(employee_id, month).await;
    log.finish(StatusCode::OK, result)
}

async fn list_additional_components(
    State(state): State<AppState>,
    Path((month, employee_id)): Path<(String, i64)>,
) -> HandlerResult {
    let log = RequestLog::begin("list additional components");
    let month = log.month(&month)?;
    let result = state
        .service()
        .list_additional_components(employee_id, month)
        .await;
    log.finish(StatusCode::OK, result)
}

async fn create_additional_component(
    State(state): State<AppState>,
    Path((month, employee_id)): Path<(String, i64)>,
    payload: Result<Json<CreateComponentRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create additional component");
    let month = log.month(&month)?;
    let request = log.body(payload)?;
    let result = state
        .service()
        .create_additional_component(employee_id, month, request)
        .await;
    log.finish(StatusCode::CREATED, result)
}

async fn delete_additional_component(
    State(state): State<AppState>,
    Path((month, employee_id, id)): Path<(String, i64, i64)>,
) -> HandlerResult {
    let log = RequestLog::begin("delete additional component");
    let month = log.month(&month)?;
    let result = state
        .service()
        .delete_additional_component(employee_id, month, id)
        .await
        .map(|()| MessageResponse::new("additional component deleted"));
    log.finish(StatusCode::OK, result)
}

async fn list_extra_infos(
    State(state): State<AppState>,
    Path((month, employee_id)): Path<(String, i64)>,
) -> HandlerResult {
    let log = RequestLog::begin("list extra infos");
    let month = log.month(&month)?;
    let result = state.service().list_extra_infos(employee_id, month).await;
    log.finish(StatusCode::OK, result)
}

async fn create_extra_info(
    State(state): State<AppState>,
    Path((month, employee_id)): Path<(String, i64)>,
    payload: Result<Json<CreateExtraInfoRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create extra info");
    let month = log.month(&month)?;
    let request = log.body(payload)?;
    let result = state
        .service()
        .create_extra_info(employee_id, month, request)
        .await;
    log.finish(StatusCode::CREATED, result)
}

async fn delete_extra_info(
    State(state): State<AppState>,
    Path((month, employee_id, id)): Path<(String, i64, i64)>,
) -> HandlerResult {
    let log = RequestLog::begin("delete extra info");
    let month = log.month(&month)?;
    let result = state
        .service()
        .delete_extra_info(employee_id, month, id)
        .await
        .map(|()| MessageResponse::new("extra info deleted"));
    log.finish(StatusCode::OK, result)
}

async fn list_static_components(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
) -> HandlerResult {
    let log = RequestLog::begin("list static components");
    let result = state.service().list_static_components(employee_id).await;
    log.finish(StatusCode::OK, result)
}

async fn create_static_component(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
    payload: Result<Json<CreateComponentRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create static component");
    let request = log.body(payload)?;
    let result = state
        .service()
        .create_static_component(employee_id, request)
        .await;
    log.finish(StatusCode::CREATED, result)
}

async fn delete_static_component(
    State(state): State<AppState>,
    Path((employee_id, id)): Path<(i64, i64)>,
) -> HandlerResult {
    let log = RequestLog::begin("delete static component");
    let result = state
        .service()
        .delete_static_component(employee_id, id)
        .await
        .map(|()| MessageResponse::new("static component deleted"));
    log.finish(StatusCode::OK, result)
}

/// Handler for GET /salary-snapshots, filtered by `employeeID` and `month`.
async fn list_snapshots(
    State(state): State<AppState>,
    Query(query): Query<SnapshotsQuery>,
) -> HandlerResult {
    let log = RequestLog::begin("list snapshots");
    let month = query.month()?;
    let result = state
        .service()
        .list_snapshots(query.employee_id, month)
        .await;
    log.finish(StatusCode::OK, result)
}

/// Handler for POST /salary-snapshots.
///
/// Computes the salary now and freezes it; later changes to the inputs do
/// not affect the stored snapshot.
async fn create_snapshot(
    State(state): State<AppState>,
    payload: Result<Json<CreateSnapshotRequest>, JsonRejection>,
) -> HandlerResult {
    let log = RequestLog::begin("create snapshot");
    let request = log.body(payload)?;
    let result = state.service().create_snapshot(request).await;
    log.finish(StatusCode::CREATED, result)
}

async fn get_snapshot(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    let log = RequestLog::begin("get snapshot");
    let result = state.service().get_snapshot(id).await;
    log.finish(StatusCode::OK, result)
}

async fn delete_snapshot(State(state): State<AppState>, Path(id): Path<i64>) -> HandlerResult {
    let log = RequestLog::begin("delete snapshot");
    let result = state
        .service()
        .delete_snapshot(id)
        .await
        .map(|()| MessageResponse::new("snapshot deleted"));
    log.finish(StatusCode::OK, result)
}
