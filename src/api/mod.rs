//! HTTP API module for the payroll engine.
//!
//! This module provides the REST API endpoints for the employee directory,
//! attendance, work logs, salary components and salary snapshots. Every
//! route except `/health` lives under `/api/v1`.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{MonthQuery, OperatorQuery, SnapshotsQuery, WorkLogsQuery};
pub use response::{ApiError, ApiErrorResponse, HealthResponse, MessageResponse};
pub use state::AppState;
