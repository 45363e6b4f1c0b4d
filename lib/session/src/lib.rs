//! Conversation session state for the bookline platform.
//!
//! This crate provides:
//!
//! - **Session**: Per (tenant, user) dialogue state plus accumulated draft
//! - **Session store**: TTL-expiring storage with compare-and-swap writes
//! - **Session gate**: At-most-one in-flight dialogue turn per key

pub mod error;
pub mod gate;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use gate::{SessionGate, SessionPermit};
pub use session::{BookingDraft, DialogueState, Session, StaffChoice};
pub use store::{MemorySessionStore, SessionStore};
