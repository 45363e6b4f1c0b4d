//! Dialogue sessions.
//!
//! A session is everything the engine knows about one end user's
//! conversation with one tenant: which state the dialogue is in, the
//! selections accumulated so far, and when the user was last heard from.

use bookline_core::{
    BookingId, CategoryId, ChannelUserId, ProductId, ServiceId, StaffId, TenantId,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// The staff preference accumulated in the booking flow.
///
/// Distinct from "not chosen yet": once the staff step completes the draft
/// holds either a named staff member or an explicit no-preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "choice")]
pub enum StaffChoice {
    /// Any qualified staff member; assignment happens at commit.
    Any,
    /// A named staff member.
    Specific { staff_id: StaffId },
}

/// Selections accumulated during the booking flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Chosen category, when the tenant uses categories.
    pub category_id: Option<CategoryId>,
    /// Chosen service.
    pub service_id: Option<ServiceId>,
    /// Staff preference; `None` until the staff step completes.
    pub staff: Option<StaffChoice>,
    /// Chosen date.
    pub date: Option<NaiveDate>,
    /// Chosen start time.
    pub time: Option<NaiveTime>,
    /// Free-text note, once entered.
    pub note: Option<String>,
}

/// Where one end user currently is in the dialogue.
///
/// Variants carry the data the state needs to validate its own inputs:
/// date and time menus remember exactly which options were offered, so only
/// an exact match of an offered option can advance the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum DialogueState {
    /// No flow in progress.
    Idle,
    /// Choosing a service category.
    SelectingCategory,
    /// Choosing a service.
    SelectingService,
    /// Choosing a staff member or "anyone".
    SelectingStaff,
    /// Choosing a date from the offered set.
    SelectingDate { offered: Vec<NaiveDate> },
    /// Choosing a start time from the offered set.
    SelectingTime { offered: Vec<NaiveTime> },
    /// Typing a note, or skipping it.
    InputtingNote,
    /// Reviewing the assembled booking.
    ConfirmingBooking,
    /// Browsing the product list.
    BrowsingProducts,
    /// Viewing one product's detail card.
    ViewingProductDetail { product_id: ProductId },
    /// Choosing how many units to order.
    SelectingQuantity { product_id: ProductId },
    /// Reviewing the assembled order.
    ConfirmingPurchase { product_id: ProductId, quantity: u32 },
    /// Browsing the coupon list.
    BrowsingCoupons,
    /// Viewing upcoming bookings, each one selectable for cancellation.
    ViewingBookings { offered: Vec<BookingId> },
    /// Confirming cancellation of one booking.
    ConfirmingCancelBooking { booking_id: BookingId },
}

impl DialogueState {
    /// Returns a short name for logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SelectingCategory => "selecting_category",
            Self::SelectingService => "selecting_service",
            Self::SelectingStaff => "selecting_staff",
            Self::SelectingDate { .. } => "selecting_date",
            Self::SelectingTime { .. } => "selecting_time",
            Self::InputtingNote => "inputting_note",
            Self::ConfirmingBooking => "confirming_booking",
            Self::BrowsingProducts => "browsing_products",
            Self::ViewingProductDetail { .. } => "viewing_product_detail",
            Self::SelectingQuantity { .. } => "selecting_quantity",
            Self::ConfirmingPurchase { .. } => "confirming_purchase",
            Self::BrowsingCoupons => "browsing_coupons",
            Self::ViewingBookings { .. } => "viewing_bookings",
            Self::ConfirmingCancelBooking { .. } => "confirming_cancel_booking",
        }
    }

    /// Returns true if no flow is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// One end user's conversation with one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The tenant the conversation belongs to.
    pub tenant_id: TenantId,
    /// The channel-assigned end user.
    pub user_id: ChannelUserId,
    /// Current dialogue state.
    pub state: DialogueState,
    /// Selections accumulated by the booking flow.
    pub draft: BookingDraft,
    /// Compare-and-swap counter; the store refuses writes carrying a stale
    /// version.
    pub version: u64,
    /// When the user was last heard from.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates an idle session for an end user.
    #[must_use]
    pub fn new(tenant_id: TenantId, user_id: ChannelUserId) -> Self {
        Self {
            tenant_id,
            user_id,
            state: DialogueState::Idle,
            draft: BookingDraft::default(),
            version: 0,
            last_active_at: Utc::now(),
        }
    }

    /// Records activity now.
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// Returns true if the session has been idle longer than `ttl` as of
    /// `now`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.last_active_at + ttl <= now
    }

    /// Resets to idle and discards the accumulated draft.
    pub fn reset(&mut self) {
        self.state = DialogueState::Idle;
        self.draft = BookingDraft::default();
    }
}
