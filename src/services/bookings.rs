//! Booking engine service

use crate::{
    error::{AppError, AppResult},
    models::booking::{parse_booking_date, Booking, BookingDetails, CreateBooking},
    repository::Repository,
};

#[derive(Clone)]
pub struct BookingsService {
    repository: Repository,
}

impl BookingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Book `equipment_id` for `user_id` on `booking_date` (`YYYY-MM-DD`).
    ///
    /// Returns the new booking id.
    pub async fn create_booking(
        &self,
        equipment_id: i32,
        user_id: i32,
        booking_date: &str,
    ) -> AppResult<i32> {
        let booking = CreateBooking {
            equipment_id,
            user_id,
            booking_date: parse_booking_date(booking_date)?,
        };

        match self.repository.bookings.create(&booking).await {
            Ok(id) => {
                tracing::info!(
                    booking_id = id,
                    equipment_id,
                    user_id,
                    date = %booking.booking_date,
                    "Booking created"
                );
                Ok(id)
            }
            Err(e @ AppError::Conflict(_)) => {
                tracing::debug!(equipment_id, user_id, "Booking rejected: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Cancel a booking, freeing its equipment
    pub async fn cancel_booking(&self, booking_id: i32) -> AppResult<Booking> {
        let booking = self.repository.bookings.cancel(booking_id).await?;
        tracing::info!(
            booking_id,
            equipment_id = booking.equipment_id,
            "Booking cancelled"
        );
        Ok(booking)
    }

    /// List bookings, optionally for a single user
    pub async fn list_bookings(&self, user_id: Option<i32>) -> AppResult<Vec<BookingDetails>> {
        self.repository.bookings.list(user_id).await
    }

    pub async fn get_by_id(&self, booking_id: i32) -> AppResult<Booking> {
        self.repository.bookings.get_by_id(booking_id).await
    }
}
