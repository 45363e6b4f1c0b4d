//! The postback action alphabet.
//!
//! Every menu option the bot sends carries one of these actions in its
//! machine-readable data field. Parsing is strict: anything that does not
//! round-trip through [`Action::parse`] is outside the alphabet and the
//! engine treats it as not understood.

use bookline_core::{BookingId, CategoryId, ProductId, ServiceId, StaffId};
use chrono::{NaiveDate, NaiveTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// A machine-readable menu action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start the booking flow.
    StartBooking,
    /// Browse the product list.
    BrowseProducts,
    /// Browse current coupons.
    BrowseCoupons,
    /// View upcoming bookings.
    ViewBookings,
    /// Pick a service category.
    SelectCategory(CategoryId),
    /// Pick a service.
    SelectService(ServiceId),
    /// Pick a named staff member.
    SelectStaff(StaffId),
    /// No staff preference.
    AnyStaff,
    /// Pick a date.
    SelectDate(NaiveDate),
    /// Pick a start time.
    SelectTime(NaiveTime),
    /// Skip the note step.
    SkipNote,
    /// Accept the pending confirmation.
    Confirm,
    /// Decline the pending confirmation.
    Decline,
    /// Go back one step.
    Back,
    /// Abandon the current flow.
    Cancel,
    /// View one product's detail card.
    ViewProduct(ProductId),
    /// Start a purchase from a product detail card.
    Buy(ProductId),
    /// Pick an order quantity.
    SelectQuantity(u32),
    /// Pick a booking to cancel.
    CancelBooking(BookingId),
}

impl Action {
    /// Renders the action as postback data.
    #[must_use]
    pub fn data(&self) -> String {
        match self {
            Self::StartBooking => "book".to_string(),
            Self::BrowseProducts => "products".to_string(),
            Self::BrowseCoupons => "coupons".to_string(),
            Self::ViewBookings => "bookings".to_string(),
            Self::SelectCategory(id) => format!("category:{id}"),
            Self::SelectService(id) => format!("service:{id}"),
            Self::SelectStaff(id) => format!("staff:{id}"),
            Self::AnyStaff => "staff:any".to_string(),
            Self::SelectDate(date) => format!("date:{}", date.format(DATE_FORMAT)),
            Self::SelectTime(time) => format!("time:{}", time.format(TIME_FORMAT)),
            Self::SkipNote => "note:skip".to_string(),
            Self::Confirm => "confirm".to_string(),
            Self::Decline => "decline".to_string(),
            Self::Back => "back".to_string(),
            Self::Cancel => "cancel".to_string(),
            Self::ViewProduct(id) => format!("product:{id}"),
            Self::Buy(id) => format!("buy:{id}"),
            Self::SelectQuantity(n) => format!("quantity:{n}"),
            Self::CancelBooking(id) => format!("booking:{id}"),
        }
    }

    /// Parses postback data. Returns `None` for anything outside the
    /// alphabet.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "book" => return Some(Self::StartBooking),
            "products" => return Some(Self::BrowseProducts),
            "coupons" => return Some(Self::BrowseCoupons),
            "bookings" => return Some(Self::ViewBookings),
            "staff:any" => return Some(Self::AnyStaff),
            "note:skip" => return Some(Self::SkipNote),
            "confirm" => return Some(Self::Confirm),
            "decline" => return Some(Self::Decline),
            "back" => return Some(Self::Back),
            "cancel" => return Some(Self::Cancel),
            _ => {}
        }

        let (prefix, rest) = data.split_once(':')?;
        match prefix {
            "category" => rest.parse().ok().map(Self::SelectCategory),
            "service" => rest.parse().ok().map(Self::SelectService),
            "staff" => rest.parse().ok().map(Self::SelectStaff),
            "date" => NaiveDate::parse_from_str(rest, DATE_FORMAT)
                .ok()
                .map(Self::SelectDate),
            "time" => NaiveTime::parse_from_str(rest, TIME_FORMAT)
                .ok()
                .map(Self::SelectTime),
            "product" => rest.parse().ok().map(Self::ViewProduct),
            "buy" => rest.parse().ok().map(Self::Buy),
            "quantity" => rest.parse().ok().map(Self::SelectQuantity),
            "booking" => rest.parse().ok().map(Self::CancelBooking),
            _ => None,
        }
    }
}
