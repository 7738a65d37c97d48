//! HR and payroll engine for a small pharmacy.
//!
//! This crate keeps the employee directory, daily attendance, work logs of
//! billable lab tests and prescriptions, and per-employee salary components,
//! and computes monthly salaries from them. Computed salaries can be frozen
//! as snapshots.
//!
//! Money is exact decimal arithmetic rounded up to whole units; day and
//! month boundaries follow the organization's configured UTC offset.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod validation;
