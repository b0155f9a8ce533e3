//! Equipment booking server
//!
//! REST JSON API for an equipment catalog with whole-day bookings. Booking
//! creation and cancellation move equipment between `available` and `booked`
//! inside one database transaction, so an item can never be double-booked.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
