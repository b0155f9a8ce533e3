//! Data models for the booking server

pub mod booking;
pub mod equipment;
pub mod user;

// Re-export commonly used types
pub use booking::{Booking, BookingDetails, CreateBooking};
pub use equipment::{Equipment, EquipmentStatus};
pub use user::{Role, User, UserClaims, UserInfo};
