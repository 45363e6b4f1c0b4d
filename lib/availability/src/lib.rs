//! Availability calculation for the bookline platform.
//!
//! This crate provides:
//!
//! - **Booking settings**: Per-tenant opening hours, slot grid, and policy
//! - **Slot calculator**: Pure functions from schedules, leaves, and
//!   existing bookings to bookable slots
//! - **Date listing**: Which dates the date menu should offer

pub mod calculator;
pub mod error;
pub mod settings;

pub use calculator::{StaffDay, slots_for_any_staff, slots_for_staff, upcoming_dates};
pub use error::AvailabilityError;
pub use settings::{BookingSettings, MemorySettings, SettingsProvider};
