//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the service
//! configuration from a YAML file.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::models::Calendar;

use super::types::ServiceConfig;

/// Loads and provides access to the service configuration.
///
/// The file is read once and validated eagerly: a UTC offset that cannot
/// be parsed fails the load rather than the first request.
///
/// # File Layout
///
/// ```text
/// server:
///   host: 0.0.0.0
///   port: 8080
///   request_timeout_secs: 30
/// database:
///   url: sqlite://payroll.db?mode=rwc
///   max_connections: 5
/// organization:
///   name: Apotek Aulia Farma
///   utc_offset: "+07:00"
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/payroll.yaml").unwrap();
/// println!("Serving {}", loader.config().organization.name);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: ServiceConfig,
    calendar: Calendar,
}

impl ConfigLoader {
    /// Loads configuration from the specified file.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - The file is missing
    /// - The file contains invalid YAML or is missing a required field
    /// - The organization UTC offset is malformed
    ///
    /// # Example
    ///
    /// ```no_run
    /// use payroll_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/payroll.yaml")?;
    /// # Ok::<(), payroll_engine::error::EngineError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let config = Self::load_yaml::<ServiceConfig>(path.as_ref())?;
        let calendar = config.calendar()?;
        Ok(Self { config, calendar })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the organization calendar.
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }
}
