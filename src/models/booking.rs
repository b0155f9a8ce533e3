//! Booking (reservation) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Booking row from the ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub booking_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Booking joined with its equipment (and user, for unfiltered listings)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookingDetails {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub equipment_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub booking_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Create booking request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub equipment_id: i32,
    pub user_id: i32,
    /// Calendar day, `YYYY-MM-DD`
    #[validate(length(min = 1, message = "booking_date is required"))]
    pub booking_date: String,
}

pub fn parse_booking_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "Invalid booking_date '{}', expected YYYY-MM-DD",
            value
        ))
    })
}

/// Validated booking creation command
#[derive(Debug, Clone, Copy)]
pub struct CreateBooking {
    pub equipment_id: i32,
    pub user_id: i32,
    pub booking_date: NaiveDate,
}

/// Booking list filter
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingQuery {
    pub user_id: Option<i32>,
}
