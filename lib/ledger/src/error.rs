//! Error types for the ledger crate.

use bookline_core::{CancelToken, ProductId, ServiceId, StaffId};
use chrono::{NaiveDate, NaiveTime};
use std::fmt;

/// Errors from committing, cancelling, or querying bookings and orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// The slot failed the commit-time recheck: another booking consumed
    /// the capacity between offer and confirmation.
    SlotTaken {
        staff_id: StaffId,
        date: NaiveDate,
        start: NaiveTime,
    },
    /// No qualified staff member had capacity for the requested interval.
    NoEligibleStaff { date: NaiveDate, start: NaiveTime },
    /// The product does not have enough stock for the order.
    OutOfStock { product_id: ProductId, requested: u32 },
    /// No booking carries the presented cancel token.
    BookingNotFound { token: CancelToken },
    /// The service cannot be booked (inactive or removed).
    ServiceUnavailable { service_id: ServiceId },
    /// The request itself is unusable (zero quantity, malformed settings).
    Invalid { reason: String },
    /// A catalog, staffing, or settings lookup failed.
    Upstream { reason: String },
    /// The ledger's own storage failed.
    Storage { reason: String },
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotTaken {
                staff_id,
                date,
                start,
            } => {
                write!(f, "slot {date} {start} for staff {staff_id} is taken")
            }
            Self::NoEligibleStaff { date, start } => {
                write!(f, "no eligible staff for {date} {start}")
            }
            Self::OutOfStock {
                product_id,
                requested,
            } => {
                write!(f, "product {product_id} has less than {requested} in stock")
            }
            Self::BookingNotFound { token } => {
                write!(f, "no booking for cancel token {token}")
            }
            Self::ServiceUnavailable { service_id } => {
                write!(f, "service {service_id} is not bookable")
            }
            Self::Invalid { reason } => write!(f, "invalid commit request: {reason}"),
            Self::Upstream { reason } => write!(f, "upstream lookup failed: {reason}"),
            Self::Storage { reason } => write!(f, "ledger storage failed: {reason}"),
        }
    }
}

impl std::error::Error for CommitError {}

impl CommitError {
    /// Returns true if the failure is a recoverable conflict the dialogue
    /// can resolve by re-offering choices, as opposed to an upstream or
    /// storage fault.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::SlotTaken { .. } | Self::NoEligibleStaff { .. } | Self::OutOfStock { .. }
        )
    }
}
