//! Bookings and the requests that create them.
//!
//! A booking is the persisted outcome of a completed dialogue: one customer,
//! one service, one staff member, one interval on one date. The interval
//! already includes the service's turnover buffer, so overlap and capacity
//! checks can work on `start..end` directly.

use bookline_core::{BookingId, CancelToken, ChannelUserId, ServiceId, StaffId, TenantId};
use bookline_staffing::TimeWindow;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting tenant confirmation.
    Pending,
    /// Confirmed by the tenant (or auto-confirmed by policy).
    Confirmed,
    /// The appointment is underway.
    InProgress,
    /// The appointment finished.
    Completed,
    /// Cancelled by either side.
    Cancelled,
    /// The customer never showed up.
    NoShow,
}

impl BookingStatus {
    /// Returns true if the booking still occupies its slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::InProgress)
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }
}

/// The channel a booking came in on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    /// Created by the chat-bot dialogue.
    ChatBot,
    /// Entered by tenant staff through the management UI.
    Operator,
}

/// A persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: BookingId,
    /// The tenant the booking belongs to.
    pub tenant_id: TenantId,
    /// The customer who booked.
    pub customer: ChannelUserId,
    /// The booked service.
    pub service_id: ServiceId,
    /// The assigned staff member. Assignment happens at commit time, so a
    /// persisted booking always names its staff even when the customer had
    /// no preference.
    pub staff_id: StaffId,
    /// The appointment date.
    pub date: NaiveDate,
    /// Start of the occupied interval.
    pub start: NaiveTime,
    /// End of the occupied interval, buffer included.
    pub end: NaiveTime,
    /// Current status.
    pub status: BookingStatus,
    /// Token the customer can present to cancel.
    pub cancel_token: CancelToken,
    /// Where the booking came from.
    pub source: BookingSource,
    /// Free-text note from the customer.
    pub note: Option<String>,
    /// When the booking was committed.
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Returns the occupied interval.
    #[must_use]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    /// Returns true if the booking still occupies its slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// A finalized dialogue draft, ready to commit.
///
/// `staff_id` of `None` means no preference; the commit service assigns the
/// first qualified staff member by sort order with capacity remaining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// The tenant the booking is for.
    pub tenant_id: TenantId,
    /// The customer booking.
    pub customer: ChannelUserId,
    /// The chosen service.
    pub service_id: ServiceId,
    /// The chosen staff member, or `None` for no preference.
    pub staff_id: Option<StaffId>,
    /// The chosen date.
    pub date: NaiveDate,
    /// The chosen start time.
    pub start: NaiveTime,
    /// Free-text note from the customer.
    pub note: Option<String>,
    /// Where the request came from.
    pub source: BookingSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_statuses() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(BookingStatus::InProgress.is_active());
        assert!(!BookingStatus::Completed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(!BookingStatus::NoShow.is_active());
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(BookingStatus::NoShow.as_str(), "no_show");
        let json = serde_json::to_string(&BookingStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn booking_window_spans_start_to_end() {
        let booking = Booking {
            id: BookingId::new(),
            tenant_id: TenantId::new(),
            customer: ChannelUserId::new("Uabc"),
            service_id: ServiceId::new(),
            staff_id: StaffId::new(),
            date: NaiveDate::from_ymd_opt(2025, 6, 10).expect("date"),
            start: NaiveTime::from_hms_opt(10, 0, 0).expect("time"),
            end: NaiveTime::from_hms_opt(11, 15, 0).expect("time"),
            status: BookingStatus::Pending,
            cancel_token: CancelToken::new(),
            source: BookingSource::ChatBot,
            note: None,
            created_at: Utc::now(),
        };

        let window = booking.window();
        assert_eq!(window.start, booking.start);
        assert_eq!(window.end, booking.end);
        assert!(booking.is_active());
    }
}
