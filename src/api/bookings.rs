//! Booking endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::booking::{Booking, BookingDetails, BookingQuery, CreateBookingRequest},
};

use super::{IdPath, MessageResponse, TypedQuery, ValidatedJson};

/// Booking creation response
#[derive(Serialize, ToSchema)]
pub struct CreateBookingResponse {
    pub message: String,
    #[serde(rename = "bookingId")]
    pub booking_id: i32,
}

/// Book a piece of equipment for a day
#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = CreateBookingResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Equipment or user not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Equipment unavailable or already booked", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<crate::AppState>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<CreateBookingResponse>)> {
    let booking_id = state
        .services
        .bookings
        .create_booking(request.equipment_id, request.user_id, &request.booking_date)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            message: "Booking created".to_string(),
            booking_id,
        }),
    ))
}

/// List bookings, newest first
#[utoipa::path(
    get,
    path = "/api/bookings",
    tag = "bookings",
    params(BookingQuery),
    responses(
        (status = 200, description = "Bookings with equipment name (and username when unfiltered)", body = Vec<BookingDetails>),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_bookings(
    State(state): State<crate::AppState>,
    TypedQuery(query): TypedQuery<BookingQuery>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    let bookings = state.services.bookings.list_bookings(query.user_id).await?;
    Ok(Json(bookings))
}

/// Get booking by ID
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    tag = "bookings",
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 404, description = "Booking not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_booking(
    State(state): State<crate::AppState>,
    IdPath(id): IdPath,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.get_by_id(id).await?;
    Ok(Json(booking))
}

/// Cancel a booking
#[utoipa::path(
    delete,
    path = "/api/bookings/{id}",
    tag = "bookings",
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled, equipment available again", body = MessageResponse),
        (status = 404, description = "Booking not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_booking(
    State(state): State<crate::AppState>,
    IdPath(id): IdPath,
) -> AppResult<Json<MessageResponse>> {
    state.services.bookings.cancel_booking(id).await?;
    Ok(Json(MessageResponse {
        message: format!("Booking {} cancelled", id),
    }))
}
