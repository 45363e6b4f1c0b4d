//! Bookable services and the categories that group them.
//!
//! Services are what the booking flow ultimately reserves: a haircut, a
//! 60-minute massage. A service may belong to a category; categories carry
//! a sort order so menus render in the order the tenant configured.

use bookline_core::{CategoryId, ServiceId, TenantId};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// A group of related services shown as one menu page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCategory {
    /// Unique category identifier.
    pub id: CategoryId,
    /// The tenant this category belongs to.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Position in menus; lower values render first.
    pub sort_order: i32,
    /// Whether the category is offered to end users.
    pub active: bool,
}

impl ServiceCategory {
    /// Creates an active category with default sort order.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            tenant_id,
            name: name.into(),
            sort_order: 0,
            active: true,
        }
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// A bookable service item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    /// Unique service identifier.
    pub id: ServiceId,
    /// The tenant this service belongs to.
    pub tenant_id: TenantId,
    /// The category the service is listed under, if the tenant uses
    /// categories.
    pub category_id: Option<CategoryId>,
    /// Display name.
    pub name: String,
    /// Optional longer description shown on detail cards.
    pub description: Option<String>,
    /// How long the appointment itself takes, in minutes.
    pub duration_minutes: u32,
    /// Cleanup or turnover time after the appointment, in minutes. The
    /// occupied interval is `duration + buffer`.
    pub buffer_minutes: u32,
    /// Price in minor currency units.
    pub price: i64,
    /// Whether the end user must pick a named staff member for this
    /// service. When false the staff step may offer "anyone".
    pub requires_staff: bool,
    /// Position in menus; lower values render first.
    pub sort_order: i32,
    /// Whether the service is offered to end users.
    pub active: bool,
}

impl ServiceItem {
    /// Creates an active, uncategorized service with no buffer time.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        duration_minutes: u32,
        price: i64,
    ) -> Self {
        Self {
            id: ServiceId::new(),
            tenant_id,
            category_id: None,
            name: name.into(),
            description: None,
            duration_minutes,
            buffer_minutes: 0,
            price,
            requires_staff: false,
            sort_order: 0,
            active: true,
        }
    }

    /// Places the service under a category.
    #[must_use]
    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the turnover buffer in minutes.
    #[must_use]
    pub fn with_buffer(mut self, buffer_minutes: u32) -> Self {
        self.buffer_minutes = buffer_minutes;
        self
    }

    /// Requires the end user to pick a named staff member.
    #[must_use]
    pub fn with_staff_required(mut self) -> Self {
        self.requires_staff = true;
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Returns the appointment duration, excluding buffer.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Returns the full interval one booking occupies: duration plus buffer.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes) + i64::from(self.buffer_minutes))
    }
}
