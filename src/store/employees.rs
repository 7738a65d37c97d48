//! Employee directory persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::info;

use super::{Database, decode_decimal, encode_timestamp};
use crate::error::{EngineError, EngineResult};
use crate::models::Employee;

const SELECT_EMPLOYEE: &str = "SELECT id, name, shift_fee, created_at, updated_at FROM employees";

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: i64,
    name: String,
    shift_fee: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmployeeRow {
    fn into_employee(self) -> EngineResult<Employee> {
        Ok(Employee {
            shift_fee: decode_decimal("employee", self.id, "shift_fee", &self.shift_fee)?,
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl Database {
    /// Returns every employee, ordered by name.
    pub async fn list_employees(&self) -> EngineResult<Vec<Employee>> {
        sqlx::query_as::<_, EmployeeRow>(&format!("{} ORDER BY name, id", SELECT_EMPLOYEE))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(EmployeeRow::into_employee)
            .collect()
    }

    /// Returns the employee, or `NotFound`.
    pub async fn get_employee(&self, id: i64) -> EngineResult<Employee> {
        sqlx::query_as::<_, EmployeeRow>(&format!("{} WHERE id = ?", SELECT_EMPLOYEE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "employee",
                id,
            })?
            .into_employee()
    }

    /// Adds an employee to the directory.
    pub async fn create_employee(&self, name: &str, shift_fee: Decimal) -> EngineResult<Employee> {
        let now = encode_timestamp(Utc::now());
        let employee = sqlx::query_as::<_, EmployeeRow>(
            "INSERT INTO employees (name, shift_fee, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, name, shift_fee, created_at, updated_at",
        )
        .bind(name)
        .bind(shift_fee.to_string())
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?
        .into_employee()?;

        info!(employee_id = employee.id, "employee created");
        Ok(employee)
    }

    /// Changes an employee's shift fee, bumping `updated_at`.
    pub async fn update_shift_fee(&self, id: i64, shift_fee: Decimal) -> EngineResult<Employee> {
        let employee = sqlx::query_as::<_, EmployeeRow>(
            "UPDATE employees SET shift_fee = ?, updated_at = ?
             WHERE id = ?
             RETURNING id, name, shift_fee, created_at, updated_at",
        )
        .bind(shift_fee.to_string())
        .bind(encode_timestamp(Utc::now()))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EngineError::NotFound {
            entity: "employee",
            id,
        })?
        .into_employee()?;

        info!(employee_id = id, shift_fee = %shift_fee, "shift fee changed");
        Ok(employee)
    }
}
