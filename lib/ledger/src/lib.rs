//! Booking ledger and commit service for the bookline platform.
//!
//! This crate provides:
//!
//! - **Bookings and orders**: The persisted outcomes of completed dialogues
//! - **Ledger trait**: Atomic recheck-and-insert storage, memory or Postgres
//! - **Commit service**: Availability recheck, staff assignment, dispatch
//! - **Dispatcher trait**: Fire-and-forget notifications about ledger events

pub mod booking;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod order;
pub mod service;

pub use booking::{Booking, BookingRequest, BookingSource, BookingStatus};
pub use dispatcher::{
    DispatchError, DispatchedEvent, FailingDispatcher, MemoryDispatcher, NotificationDispatcher,
};
pub use error::CommitError;
pub use ledger::{BookingLedger, MemoryLedger};
pub use order::{OrderRequest, OrderStatus, ProductOrder};
pub use service::CommitService;
