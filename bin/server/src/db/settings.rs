//! Postgres settings repository.

use super::decode_error;
use async_trait::async_trait;
use bookline_availability::{AvailabilityError, BookingSettings, SettingsProvider};
use bookline_core::TenantId;
use bookline_staffing::TimeWindow;
use chrono::{NaiveTime, Weekday};
use sqlx::{FromRow, PgPool};

#[derive(FromRow)]
struct SettingsRow {
    open: NaiveTime,
    close: NaiveTime,
    slot_minutes: i32,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
    closed_weekdays: serde_json::Value,
    max_advance_days: i32,
    offer_staff_choice: bool,
    auto_confirm: bool,
    session_ttl_minutes: i32,
}

impl SettingsRow {
    fn try_into_settings(self) -> Result<BookingSettings, sqlx::Error> {
        let closed_weekdays: Vec<Weekday> = serde_json::from_value(self.closed_weekdays.clone())
            .map_err(|e| decode_error("closed weekdays", &self.closed_weekdays.to_string(), e))?;
        let break_window = match (self.break_start, self.break_end) {
            (Some(start), Some(end)) => Some(TimeWindow::new(start, end)),
            _ => None,
        };
        Ok(BookingSettings {
            open: self.open,
            close: self.close,
            slot_minutes: u32::try_from(self.slot_minutes)
                .map_err(|e| decode_error("slot minutes", &self.slot_minutes.to_string(), e))?,
            break_window,
            closed_weekdays,
            max_advance_days: u32::try_from(self.max_advance_days).map_err(|e| {
                decode_error("max advance days", &self.max_advance_days.to_string(), e)
            })?,
            offer_staff_choice: self.offer_staff_choice,
            auto_confirm: self.auto_confirm,
            session_ttl_minutes: u32::try_from(self.session_ttl_minutes).map_err(|e| {
                decode_error("session ttl", &self.session_ttl_minutes.to_string(), e)
            })?,
        })
    }
}

/// Settings repository over Postgres.
pub struct PgSettings {
    pool: PgPool,
}

impl PgSettings {
    /// Creates a repository over the connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsProvider for PgSettings {
    async fn booking_settings(
        &self,
        tenant_id: TenantId,
    ) -> Result<BookingSettings, AvailabilityError> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r#"
            SELECT open, close, slot_minutes, break_start, break_end,
                   closed_weekdays, max_advance_days, offer_staff_choice,
                   auto_confirm, session_ttl_minutes
            FROM booking_settings
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AvailabilityError::StorageFailed {
            reason: e.to_string(),
        })?;

        match row {
            Some(r) => r
                .try_into_settings()
                .map_err(|e| AvailabilityError::StorageFailed {
                    reason: e.to_string(),
                }),
            None => Err(AvailabilityError::SettingsNotFound { tenant_id }),
        }
    }
}
