//! Repository layer for database operations

pub mod bookings;
pub mod equipment;
pub mod users;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::equipment::Equipment,
};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub equipment: equipment::EquipmentRepository,
    pub bookings: bookings::BookingsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            bookings: bookings::BookingsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip a trivial query to check connectivity
    pub async fn ping(&self) -> AppResult<()> {
        let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

// Every write path that touches the booked state takes the equipment row lock
// first and only then reads or writes booking rows.

/// Lock an equipment row for the rest of the current transaction
pub(crate) async fn lock_equipment(conn: &mut PgConnection, id: i32) -> AppResult<Equipment> {
    sqlx::query_as::<_, Equipment>(
        r#"
        SELECT id, name, description, status, created_at
        FROM equipments
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
}

/// Whether any live booking references the equipment
pub(crate) async fn has_live_booking(conn: &mut PgConnection, equipment_id: i32) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM bookings WHERE equipment_id = $1)",
    )
    .bind(equipment_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}
