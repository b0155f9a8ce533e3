//! Equipment catalog repository

use sqlx::{Pool, Postgres};

use super::{has_live_booking, lock_equipment};
use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment, EquipmentStatus, UpdateEquipment},
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List equipment, optionally filtered by status, ordered by name then id
    pub async fn list(&self, status: Option<EquipmentStatus>) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT id, name, description, status, created_at
            FROM equipments
            WHERE $1::text IS NULL OR status = $1
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>(
            "SELECT id, name, description, status, created_at FROM equipments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Create equipment, initially available
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipments (name, description, status)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, status, created_at
            "#,
        )
        .bind(data.name.trim())
        .bind(data.description.as_deref().unwrap_or(""))
        .bind(EquipmentStatus::Available)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update equipment.
    ///
    /// Status changes run under the row lock: `booked` cannot be set by hand,
    /// and an item with a live booking cannot leave `booked`.
    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let current = lock_equipment(&mut tx, id).await?;

        if let Some(status) = data.status.filter(|s| *s != current.status) {
            if has_live_booking(&mut tx, id).await? {
                return Err(AppError::Conflict(format!(
                    "Equipment {} has active bookings, its status is managed by bookings",
                    id
                )));
            }
            if status == EquipmentStatus::Booked {
                return Err(AppError::Validation(
                    "Status 'booked' can only be set by creating a booking".to_string(),
                ));
            }
        }

        let row = sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipments
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status)
            WHERE id = $1
            RETURNING id, name, description, status, created_at
            "#,
        )
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(data.description.as_deref())
        .bind(data.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Delete equipment unless a live booking references it.
    ///
    /// The check and the delete share one transaction holding the row lock, so
    /// a booking cannot slip in between them.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        lock_equipment(&mut tx, id).await?;

        if has_live_booking(&mut tx, id).await? {
            return Err(AppError::InUse(format!("Equipment {} has active bookings", id)));
        }

        sqlx::query("DELETE FROM equipments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
