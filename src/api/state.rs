//! Application state for the payroll API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::service::PayrollService;

/// Shared application state.
///
/// Contains resources that are shared across all request handlers:
/// the payroll service and the organization name.
#[derive(Clone)]
pub struct AppState {
    service: Arc<PayrollService>,
    organization: Arc<str>,
}

impl AppState {
    /// Creates a new application state around the given service.
    pub fn new(service: PayrollService, organization: impl Into<String>) -> Self {
        Self {
            service: Arc::new(service),
            organization: Arc::from(organization.into()),
        }
    }

    /// Returns a reference to the payroll service.
    pub fn service(&self) -> &PayrollService {
        &self.service
    }

    /// Returns the organization name.
    pub fn organization(&self) -> &str {
        &self.organization
    }
}
