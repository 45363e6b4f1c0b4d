//! Coupons end users can browse from the chat menu.

use bookline_core::{CouponId, TenantId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A promotional coupon with a validity window.
///
/// Coupons are informational in the chat flow: the bot shows what is
/// currently redeemable and the terms, and redemption happens in store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// The tenant this coupon belongs to.
    pub tenant_id: TenantId,
    /// Short title shown in the coupon list.
    pub title: String,
    /// Terms and conditions shown on the detail card.
    pub description: Option<String>,
    /// First day the coupon can be redeemed.
    pub valid_from: NaiveDate,
    /// Last day the coupon can be redeemed.
    pub valid_until: NaiveDate,
    /// Position in menus; lower values render first.
    pub sort_order: i32,
    /// Whether the coupon is offered to end users.
    pub active: bool,
}

impl Coupon {
    /// Creates an active coupon with default sort order.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        title: impl Into<String>,
        valid_from: NaiveDate,
        valid_until: NaiveDate,
    ) -> Self {
        Self {
            id: CouponId::new(),
            tenant_id,
            title: title.into(),
            description: None,
            valid_from,
            valid_until,
            sort_order: 0,
            active: true,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Returns true if `date` falls inside the validity window, inclusive.
    #[must_use]
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn validity_window_is_inclusive() {
        let coupon = Coupon::new(
            TenantId::new(),
            "10% off color",
            date(2025, 6, 1),
            date(2025, 6, 30),
        );
        assert!(coupon.is_valid_on(date(2025, 6, 1)));
        assert!(coupon.is_valid_on(date(2025, 6, 30)));
        assert!(!coupon.is_valid_on(date(2025, 5, 31)));
        assert!(!coupon.is_valid_on(date(2025, 7, 1)));
    }

    #[test]
    fn coupon_serde_roundtrip() {
        let coupon = Coupon::new(
            TenantId::new(),
            "First visit",
            date(2025, 1, 1),
            date(2025, 12, 31),
        )
        .with_description("New customers only");
        let json = serde_json::to_string(&coupon).expect("serialize");
        let parsed: Coupon = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(coupon, parsed);
    }
}
