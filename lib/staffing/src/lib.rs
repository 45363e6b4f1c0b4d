//! Staffing service for the bookline platform.
//!
//! This crate provides:
//!
//! - **Time windows**: The half-open interval type all scheduling math uses
//! - **Weekly schedules**: Per-weekday working windows, split shifts allowed
//! - **Staff roster**: Who works for a tenant and what they can perform
//! - **Leaves**: Full-day and partial absences
//! - **Provider trait**: Read access backed by Postgres or memory

pub mod error;
pub mod leave;
pub mod provider;
pub mod schedule;
pub mod staff;

pub use error::StaffingError;
pub use leave::{Leave, LeaveKind};
pub use provider::{MemoryStaffing, StaffProvider};
pub use schedule::{TimeWindow, WeeklySchedule};
pub use staff::Staff;
