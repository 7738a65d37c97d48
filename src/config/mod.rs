//! Configuration loading and management for the payroll service.
//!
//! This module loads the service configuration from a YAML file: the HTTP
//! listener, the relational store and the organization calendar.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/payroll.yaml").unwrap();
//! println!("Listening on {}", config.config().bind_address());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{DatabaseConfig, OrganizationConfig, ServerConfig, ServiceConfig};
