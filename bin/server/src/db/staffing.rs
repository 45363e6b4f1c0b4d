//! Postgres staffing repository.

use super::decode_error;
use async_trait::async_trait;
use bookline_core::{ServiceId, StaffId, TenantId};
use bookline_staffing::{Leave, Staff, StaffProvider, StaffingError, TimeWindow, WeeklySchedule};
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

#[derive(FromRow)]
struct StaffRow {
    id: String,
    tenant_id: String,
    name: String,
    service_ids: serde_json::Value,
    schedule: serde_json::Value,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
    capacity: i32,
    sort_order: i32,
    active: bool,
}

impl StaffRow {
    fn try_into_staff(self) -> Result<Staff, sqlx::Error> {
        let service_ids: Vec<ServiceId> = serde_json::from_value(self.service_ids.clone())
            .map_err(|e| decode_error("staff service ids", &self.service_ids.to_string(), e))?;
        let schedule: WeeklySchedule = serde_json::from_value(self.schedule.clone())
            .map_err(|e| decode_error("staff schedule", &self.schedule.to_string(), e))?;
        let break_window = match (self.break_start, self.break_end) {
            (Some(start), Some(end)) => Some(TimeWindow::new(start, end)),
            _ => None,
        };
        Ok(Staff {
            id: StaffId::from_str(&self.id).map_err(|e| decode_error("staff id", &self.id, e))?,
            tenant_id: TenantId::from_str(&self.tenant_id)
                .map_err(|e| decode_error("tenant id", &self.tenant_id, e))?,
            name: self.name,
            service_ids,
            schedule,
            break_window,
            capacity: u32::try_from(self.capacity)
                .map_err(|e| decode_error("capacity", &self.capacity.to_string(), e))?,
            sort_order: self.sort_order,
            active: self.active,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    staff_id: String,
    date: NaiveDate,
    window_start: Option<NaiveTime>,
    window_end: Option<NaiveTime>,
}

impl LeaveRow {
    fn try_into_leave(self) -> Result<Leave, sqlx::Error> {
        let staff_id = StaffId::from_str(&self.staff_id)
            .map_err(|e| decode_error("staff id", &self.staff_id, e))?;
        Ok(match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => {
                Leave::partial(staff_id, self.date, TimeWindow::new(start, end))
            }
            _ => Leave::full_day(staff_id, self.date),
        })
    }
}

fn storage_failed(e: sqlx::Error) -> StaffingError {
    StaffingError::StorageFailed {
        reason: e.to_string(),
    }
}

/// Staffing repository over Postgres.
pub struct PgStaffing {
    pool: PgPool,
}

impl PgStaffing {
    /// Creates a repository over the connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffProvider for PgStaffing {
    async fn list_staff_for_service(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<Vec<Staff>, StaffingError> {
        let rows: Vec<StaffRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, name, service_ids, schedule, break_start,
                   break_end, capacity, sort_order, active
            FROM staff
            WHERE tenant_id = $1 AND active
              AND service_ids @> to_jsonb($2::text)
            ORDER BY sort_order, id
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(service_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_staff().map_err(storage_failed))
            .collect()
    }

    async fn get_staff(&self, tenant_id: TenantId, id: StaffId) -> Result<Staff, StaffingError> {
        let row: Option<StaffRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, name, service_ids, schedule, break_start,
                   break_end, capacity, sort_order, active
            FROM staff
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => r.try_into_staff().map_err(storage_failed),
            None => Err(StaffingError::StaffNotFound { tenant_id, id }),
        }
    }

    async fn list_leaves_on(
        &self,
        tenant_id: TenantId,
        date: NaiveDate,
    ) -> Result<Vec<Leave>, StaffingError> {
        let rows: Vec<LeaveRow> = sqlx::query_as(
            r#"
            SELECT staff_id, date, window_start, window_end
            FROM staff_leaves
            WHERE tenant_id = $1 AND date = $2
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_leave().map_err(storage_failed))
            .collect()
    }
}
