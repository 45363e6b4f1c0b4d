//! Per-tenant booking settings.
//!
//! One record per tenant controls the slot grid (opening hours, granularity,
//! break), which dates may be offered, and flow policy knobs the dialogue
//! engine reads (staff choice, auto-confirm, session TTL).

use crate::error::AvailabilityError;
use async_trait::async_trait;
use bookline_core::TenantId;
use bookline_staffing::TimeWindow;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Tenant-level booking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSettings {
    /// Opening time.
    pub open: NaiveTime,
    /// Closing time; no booking may end after it.
    pub close: NaiveTime,
    /// Slot grid step in minutes.
    pub slot_minutes: u32,
    /// Shop-wide break during which no booking may overlap.
    pub break_window: Option<TimeWindow>,
    /// Weekdays the shop is closed.
    pub closed_weekdays: Vec<Weekday>,
    /// How many days ahead bookings may be made, counting today as 0.
    pub max_advance_days: u32,
    /// Whether the flow offers a staff-selection step. When false every
    /// booking is made with no staff preference.
    pub offer_staff_choice: bool,
    /// Whether committed bookings start as confirmed instead of pending.
    pub auto_confirm: bool,
    /// Minutes of inactivity before a dialogue session expires.
    pub session_ttl_minutes: u32,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            close: NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
            slot_minutes: 30,
            break_window: None,
            closed_weekdays: Vec::new(),
            max_advance_days: 30,
            offer_staff_choice: true,
            auto_confirm: false,
            session_ttl_minutes: 30,
        }
    }
}

impl BookingSettings {
    /// Returns true if the shop is closed on the weekday.
    #[must_use]
    pub fn is_closed_on(&self, weekday: Weekday) -> bool {
        self.closed_weekdays.contains(&weekday)
    }

    /// Checks the settings are usable for slot calculation.
    pub fn validate(&self) -> Result<(), AvailabilityError> {
        if self.open >= self.close {
            return Err(AvailabilityError::InvalidSettings {
                reason: format!("open {} is not before close {}", self.open, self.close),
            });
        }
        if self.slot_minutes == 0 {
            return Err(AvailabilityError::InvalidSettings {
                reason: "slot granularity is zero".to_string(),
            });
        }
        if let Some(break_window) = &self.break_window {
            if !break_window.is_well_formed() {
                return Err(AvailabilityError::InvalidSettings {
                    reason: format!(
                        "break window {}..{} is inverted",
                        break_window.start, break_window.end
                    ),
                });
            }
        }
        if self.closed_weekdays.len() >= 7 {
            return Err(AvailabilityError::InvalidSettings {
                reason: "closed every day of the week".to_string(),
            });
        }
        Ok(())
    }
}

/// Read access to per-tenant booking settings.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Gets the booking settings for a tenant.
    async fn booking_settings(
        &self,
        tenant_id: TenantId,
    ) -> Result<BookingSettings, AvailabilityError>;
}

/// In-memory settings provider for tests and local development.
#[derive(Debug, Default)]
pub struct MemorySettings {
    settings: Arc<RwLock<HashMap<TenantId, BookingSettings>>>,
}

impl MemorySettings {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores settings for a tenant.
    pub fn put(&self, tenant_id: TenantId, settings: BookingSettings) {
        self.settings.write().unwrap().insert(tenant_id, settings);
    }
}

impl Clone for MemorySettings {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
        }
    }
}

#[async_trait]
impl SettingsProvider for MemorySettings {
    async fn booking_settings(
        &self,
        tenant_id: TenantId,
    ) -> Result<BookingSettings, AvailabilityError> {
        self.settings
            .read()
            .unwrap()
            .get(&tenant_id)
            .cloned()
            .ok_or(AvailabilityError::SettingsNotFound { tenant_id })
    }
}
