//! Salary component, extra info and snapshot persistence.
//!
//! Components and extra infos are hard-deleted; snapshots are marked
//! deleted and kept. Every delete is scoped by owner (and month where the
//! record has one) and reports `NotFound` when nothing matched.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::info;

use super::{
    Database, WriteTransaction, decode_decimal, decode_month, encode_timestamp, ensure_employee,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AdditionalComponent, Component, ExtraInfo, Month, Salary, Snapshot, SnapshotPayload,
    StaticComponent,
};

#[derive(Debug, FromRow)]
struct StaticComponentRow {
    id: i64,
    employee_id: i64,
    description: String,
    amount: String,
    multiplier: String,
    created_at: DateTime<Utc>,
}

impl StaticComponentRow {
    fn into_component(self) -> EngineResult<StaticComponent> {
        const ENTITY: &str = "static component";
        Ok(StaticComponent {
            amount: decode_decimal(ENTITY, self.id, "amount", &self.amount)?,
            multiplier: decode_decimal(ENTITY, self.id, "multiplier", &self.multiplier)?,
            id: self.id,
            employee_id: self.employee_id,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AdditionalComponentRow {
    id: i64,
    employee_id: i64,
    month: String,
    description: String,
    amount: String,
    multiplier: String,
    created_at: DateTime<Utc>,
}

impl AdditionalComponentRow {
    fn into_component(self) -> EngineResult<AdditionalComponent> {
        const ENTITY: &str = "additional component";
        Ok(AdditionalComponent {
            month: decode_month(ENTITY, self.id, &self.month)?,
            amount: decode_decimal(ENTITY, self.id, "amount", &self.amount)?,
            multiplier: decode_decimal(ENTITY, self.id, "multiplier", &self.multiplier)?,
            id: self.id,
            employee_id: self.employee_id,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ExtraInfoRow {
    id: i64,
    employee_id: i64,
    month: String,
    title: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl ExtraInfoRow {
    fn into_extra_info(self) -> EngineResult<ExtraInfo> {
        Ok(ExtraInfo {
            month: decode_month("extra info", self.id, &self.month)?,
            id: self.id,
            employee_id: self.employee_id,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: i64,
    employee_id: i64,
    month: String,
    salary: String,
    created_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn into_snapshot(self) -> EngineResult<Snapshot> {
        let salary = SnapshotPayload::decode(&self.salary).map_err(|message| {
            EngineError::CorruptRecord {
                entity: "snapshot",
                id: self.id,
                message,
            }
        })?;

        Ok(Snapshot {
            month: decode_month("snapshot", self.id, &self.month)?,
            id: self.id,
            employee_id: self.employee_id,
            salary,
            created_at: self.created_at,
        })
    }
}

fn deleted_or_not_found(rows_affected: u64, entity: &'static str, id: i64) -> EngineResult<()> {
    if rows_affected == 0 {
        Err(EngineError::NotFound { entity, id })
    } else {
        Ok(())
    }
}

async fn insert_static_component(
    conn: &mut SqliteConnection,
    employee_id: i64,
    component: &Component,
) -> EngineResult<StaticComponent> {
    ensure_employee(conn, employee_id).await?;
    sqlx::query_as::<_, StaticComponentRow>(
        "INSERT INTO salary_static_components (employee_id, description, amount, multiplier, created_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id, employee_id, description, amount, multiplier, created_at",
    )
    .bind(employee_id)
    .bind(&component.description)
    .bind(component.amount.to_string())
    .bind(component.multiplier.to_string())
    .bind(encode_timestamp(Utc::now()))
    .fetch_one(conn)
    .await?
    .into_component()
}

async fn insert_additional_component(
    conn: &mut SqliteConnection,
    employee_id: i64,
    month: Month,
    component: &Component,
) -> EngineResult<AdditionalComponent> {
    ensure_employee(conn, employee_id).await?;
    sqlx::query_as::<_, AdditionalComponentRow>(
        "INSERT INTO salary_additional_components
            (employee_id, month, description, amount, multiplier, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING id, employee_id, month, description, amount, multiplier, created_at",
    )
    .bind(employee_id)
    .bind(month.to_string())
    .bind(&component.description)
    .bind(component.amount.to_string())
    .bind(component.multiplier.to_string())
    .bind(encode_timestamp(Utc::now()))
    .fetch_one(conn)
    .await?
    .into_component()
}

async fn insert_extra_info(
    conn: &mut SqliteConnection,
    employee_id: i64,
    month: Month,
    title: &str,
    description: &str,
) -> EngineResult<ExtraInfo> {
    ensure_employee(conn, employee_id).await?;
    sqlx::query_as::<_, ExtraInfoRow>(
        "INSERT INTO salary_extra_infos (employee_id, month, title, description, created_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id, employee_id, month, title, description, created_at",
    )
    .bind(employee_id)
    .bind(month.to_string())
    .bind(title)
    .bind(description)
    .bind(encode_timestamp(Utc::now()))
    .fetch_one(conn)
    .await?
    .into_extra_info()
}

impl Database {
    /// Returns the employee's static components, oldest first.
    pub async fn list_static_components(&self, employee_id: i64) -> EngineResult<Vec<StaticComponent>> {
        sqlx::query_as::<_, StaticComponentRow>(
            "SELECT id, employee_id, description, amount, multiplier, created_at
             FROM salary_static_components
             WHERE employee_id = ?
             ORDER BY id",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(StaticComponentRow::into_component)
        .collect()
    }

    /// Adds a static component to an existing employee.
    pub async fn create_static_component(
        &self,
        employee_id: i64,
        component: &Component,
    ) -> EngineResult<StaticComponent> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = insert_static_component(tx.conn()?, employee_id, component).await;
        let created = tx.finish(result).await?;

        info!(employee_id, component_id = created.id, "static component created");
        Ok(created)
    }

    /// Removes the employee's static component.
    pub async fn delete_static_component(&self, employee_id: i64, id: i64) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM salary_static_components WHERE id = ? AND employee_id = ?")
            .bind(id)
            .bind(employee_id)
            .execute(&self.pool)
            .await?;

        deleted_or_not_found(result.rows_affected(), "static component", id)?;
        info!(employee_id, component_id = id, "static component deleted");
        Ok(())
    }

    /// Returns the employee's additional components for the month, oldest
    /// first.
    pub async fn list_additional_components(
        &self,
        employee_id: i64,
        month: Month,
    ) -> EngineResult<Vec<AdditionalComponent>> {
        sqlx::query_as::<_, AdditionalComponentRow>(
            "SELECT id, employee_id, month, description, amount, multiplier, created_at
             FROM salary_additional_components
             WHERE employee_id = ? AND month = ?
             ORDER BY id",
        )
        .bind(employee_id)
        .bind(month.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(AdditionalComponentRow::into_component)
        .collect()
    }

    /// Adds a one-off component to an existing employee's month.
    pub async fn create_additional_component(
        &self,
        employee_id: i64,
        month: Month,
        component: &Component,
    ) -> EngineResult<AdditionalComponent> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = insert_additional_component(tx.conn()?, employee_id, month, component).await;
        let created = tx.finish(result).await?;

        info!(employee_id, month = %month, component_id = created.id, "additional component created");
        Ok(created)
    }

    /// Removes the additional component if it belongs to the employee and
    /// month.
    pub async fn delete_additional_component(
        &self,
        employee_id: i64,
        month: Month,
        id: i64,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            "DELETE FROM salary_additional_components WHERE id = ? AND employee_id = ? AND month = ?",
        )
        .bind(id)
        .bind(employee_id)
        .bind(month.to_string())
        .execute(&self.pool)
        .await?;

        deleted_or_not_found(result.rows_affected(), "additional component", id)?;
        info!(employee_id, month = %month, component_id = id, "additional component deleted");
        Ok(())
    }

    /// Returns the employee's extra infos for the month, oldest first.
    pub async fn list_extra_infos(&self, employee_id: i64, month: Month) -> EngineResult<Vec<ExtraInfo>> {
        sqlx::query_as::<_, ExtraInfoRow>(
            "SELECT id, employee_id, month, title, description, created_at
             FROM salary_extra_infos
             WHERE employee_id = ? AND month = ?
             ORDER BY id",
        )
        .bind(employee_id)
        .bind(month.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ExtraInfoRow::into_extra_info)
        .collect()
    }

    /// Attaches a note to an existing employee's month.
    pub async fn create_extra_info(
        &self,
        employee_id: i64,
        month: Month,
        title: &str,
        description: &str,
    ) -> EngineResult<ExtraInfo> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;
        let result = insert_extra_info(tx.conn()?, employee_id, month, title, description).await;
        let created = tx.finish(result).await?;

        info!(employee_id, month = %month, extra_info_id = created.id, "extra info created");
        Ok(created)
    }

    /// Removes the extra info if it belongs to the employee and month.
    pub async fn delete_extra_info(&self, employee_id: i64, month: Month, id: i64) -> EngineResult<()> {
        let result = sqlx::query(
            "DELETE FROM salary_extra_infos WHERE id = ? AND employee_id = ? AND month = ?",
        )
        .bind(id)
        .bind(employee_id)
        .bind(month.to_string())
        .execute(&self.pool)
        .await?;

        deleted_or_not_found(result.rows_affected(), "extra info", id)?;
        info!(employee_id, month = %month, extra_info_id = id, "extra info deleted");
        Ok(())
    }

    /// Stores a computed salary as a new snapshot.
    pub async fn create_snapshot(
        &self,
        employee_id: i64,
        month: Month,
        salary: &Salary,
    ) -> EngineResult<Snapshot> {
        let payload = SnapshotPayload::encode(salary)?;

        let snapshot = sqlx::query_as::<_, SnapshotRow>(
            "INSERT INTO salary_snapshots (employee_id, month, salary, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, employee_id, month, salary, created_at",
        )
        .bind(employee_id)
        .bind(month.to_string())
        .bind(payload)
        .bind(encode_timestamp(Utc::now()))
        .fetch_one(&self.pool)
        .await?
        .into_snapshot()?;

        info!(employee_id, month = %month, snapshot_id = snapshot.id, "salary snapshot created");
        Ok(snapshot)
    }

    /// Returns live snapshots, newest id first, optionally filtered by
    /// employee and month.
    pub async fn list_snapshots(
        &self,
        employee_id: Option<i64>,
        month: Option<Month>,
    ) -> EngineResult<Vec<Snapshot>> {
        let month = month.map(|m| m.to_string());

        sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, employee_id, month, salary, created_at
             FROM salary_snapshots
             WHERE deleted_at IS NULL
               AND (? IS NULL OR employee_id = ?)
               AND (? IS NULL OR month = ?)
             ORDER BY id DESC",
        )
        .bind(employee_id)
        .bind(employee_id)
        .bind(&month)
        .bind(&month)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SnapshotRow::into_snapshot)
        .collect()
    }

    /// Returns a live snapshot, or `NotFound`.
    pub async fn get_snapshot(&self, id: i64) -> EngineResult<Snapshot> {
        sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, employee_id, month, salary, created_at
             FROM salary_snapshots
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EngineError::NotFound {
            entity: "snapshot",
            id,
        })?
        .into_snapshot()
    }

    /// Marks a live snapshot deleted.
    pub async fn delete_snapshot(&self, id: i64) -> EngineResult<()> {
        let result = sqlx::query(
            "UPDATE salary_snapshots SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(encode_timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        deleted_or_not_found(result.rows_affected(), "snapshot", id)?;
        info!(snapshot_id = id, "salary snapshot deleted");
        Ok(())
    }
}
