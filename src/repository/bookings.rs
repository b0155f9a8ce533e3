//! Bookings repository: the booking ledger and its transitions on the catalog

use sqlx::{Pool, Postgres};

use super::{has_live_booking, lock_equipment};
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{Booking, BookingDetails, CreateBooking},
        equipment::EquipmentStatus,
    },
};

#[derive(Clone)]
pub struct BookingsRepository {
    pool: Pool<Postgres>,
}

impl BookingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get booking by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "SELECT id, user_id, equipment_id, booking_date, created_at FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    /// List bookings, newest booking date first.
    ///
    /// The username is only joined in for the unfiltered listing.
    pub async fn list(&self, user_id: Option<i32>) -> AppResult<Vec<BookingDetails>> {
        let rows = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, BookingDetails>(
                    r#"
                    SELECT b.id, b.user_id, b.equipment_id, e.name AS equipment_name,
                           NULL::text AS username, b.booking_date, b.created_at
                    FROM bookings b
                    JOIN equipments e ON e.id = b.equipment_id
                    WHERE b.user_id = $1
                    ORDER BY b.booking_date DESC, b.created_at DESC, b.id DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, BookingDetails>(
                    r#"
                    SELECT b.id, b.user_id, b.equipment_id, e.name AS equipment_name,
                           u.username, b.booking_date, b.created_at
                    FROM bookings b
                    JOIN equipments e ON e.id = b.equipment_id
                    JOIN users u ON u.id = b.user_id
                    ORDER BY b.booking_date DESC, b.created_at DESC, b.id DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Create a booking and mark the equipment booked, atomically.
    ///
    /// Concurrent attempts on the same equipment serialize on its row lock;
    /// the first commits and every later one observes `booked`.
    pub async fn create(&self, booking: &CreateBooking) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let equipment = lock_equipment(&mut tx, booking.equipment_id).await?;

        if equipment.status != EquipmentStatus::Available {
            return Err(AppError::Conflict(format!(
                "Equipment {} is unavailable ({})",
                equipment.id, equipment.status
            )));
        }

        let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(booking.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !user_exists {
            return Err(AppError::NotFound(format!("User with id {} not found", booking.user_id)));
        }

        if has_live_booking(&mut tx, booking.equipment_id).await? {
            return Err(AppError::Conflict(format!(
                "Equipment {} is already booked",
                booking.equipment_id
            )));
        }

        let booking_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO bookings (user_id, equipment_id, booking_date)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.equipment_id)
        .bind(booking.booking_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            // user removed between the existence check and the insert
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::NotFound(format!("User with id {} not found", booking.user_id))
            }
            _ => AppError::Database(e),
        })?;

        sqlx::query("UPDATE equipments SET status = $2 WHERE id = $1")
            .bind(booking.equipment_id)
            .bind(EquipmentStatus::Booked)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(booking_id)
    }

    /// Delete a booking and make its equipment available again, atomically.
    ///
    /// Returns the removed booking. A second cancel of the same id is `NotFound`.
    pub async fn cancel(&self, booking_id: i32) -> AppResult<Booking> {
        let not_found = || AppError::NotFound(format!("Booking {} not found", booking_id));

        let mut tx = self.pool.begin().await?;

        let equipment_id: i32 = sqlx::query_scalar("SELECT equipment_id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(not_found)?;

        // Equipment first, matching create and delete
        match lock_equipment(&mut tx, equipment_id).await {
            Ok(_) => {}
            // equipment deleted meanwhile, the booking went with it
            Err(AppError::NotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e),
        }

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            DELETE FROM bookings
            WHERE id = $1
            RETURNING id, user_id, equipment_id, booking_date, created_at
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?;

        sqlx::query("UPDATE equipments SET status = $2 WHERE id = $1")
            .bind(equipment_id)
            .bind(EquipmentStatus::Available)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(booking)
    }
}
