//! Staff members and what they can perform.

use crate::schedule::{TimeWindow, WeeklySchedule};
use bookline_core::{ServiceId, StaffId, TenantId};
use serde::{Deserialize, Serialize};

/// A staff member who performs services for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    /// Unique staff identifier.
    pub id: StaffId,
    /// The tenant this staff member works for.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Services this staff member can perform.
    pub service_ids: Vec<ServiceId>,
    /// Weekly working windows.
    pub schedule: WeeklySchedule,
    /// Daily break taken on any working day.
    pub break_window: Option<TimeWindow>,
    /// Maximum simultaneous active bookings over any overlapping interval.
    pub capacity: u32,
    /// Position in menus; lower values render first. Also the assignment
    /// order when the end user picks "anyone".
    pub sort_order: i32,
    /// Whether the staff member currently takes bookings.
    pub active: bool,
}

impl Staff {
    /// Creates an active staff member with capacity 1, no capabilities, and
    /// every day off.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: StaffId::new(),
            tenant_id,
            name: name.into(),
            service_ids: Vec::new(),
            schedule: WeeklySchedule::new(),
            break_window: None,
            capacity: 1,
            sort_order: 0,
            active: true,
        }
    }

    /// Sets the services this staff member can perform.
    #[must_use]
    pub fn with_services(mut self, service_ids: Vec<ServiceId>) -> Self {
        self.service_ids = service_ids;
        self
    }

    /// Sets the weekly schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: WeeklySchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Sets the daily break window.
    #[must_use]
    pub fn with_break(mut self, break_window: TimeWindow) -> Self {
        self.break_window = Some(break_window);
        self
    }

    /// Sets the booking capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Returns true if this staff member can perform the service.
    #[must_use]
    pub fn can_perform(&self, service_id: ServiceId) -> bool {
        self.service_ids.contains(&service_id)
    }
}
