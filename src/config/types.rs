//! Configuration types for the payroll service.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from the YAML configuration file.

use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::models::Calendar;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind, such as `0.0.0.0`.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on the work done for a single request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://payroll.db?mode=rwc`.
    pub url: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// The organization the service keeps books for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrganizationConfig {
    /// Display name.
    pub name: String,
    /// Fixed UTC offset of the organization's calendar, e.g. `+07:00`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Relational store settings.
    pub database: DatabaseConfig,
    /// Organization settings.
    pub organization: OrganizationConfig,
}

impl ServiceConfig {
    /// Builds the organization calendar from the configured UTC offset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParseError` if the offset is not of the form `+HH:MM`.
    pub fn calendar(&self) -> EngineResult<Calendar> {
        let offset = self
            .organization
            .utc_offset
            .parse::<FixedOffset>()
            .map_err(|e| EngineError::ConfigParseError {
                path: "organization.utc_offset".to_string(),
                message: format!("{}: {}", self.organization.utc_offset, e),
            })?;
        Ok(Calendar::new(offset))
    }

    /// The per-request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// The `host:port` pair to listen on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    5
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}
