//! Staffing access behind a provider trait.

use crate::error::StaffingError;
use crate::leave::Leave;
use crate::staff::Staff;
use async_trait::async_trait;
use bookline_core::{ServiceId, StaffId, TenantId};
use chrono::NaiveDate;
use std::sync::{Arc, RwLock};

/// Read access to a tenant's staff roster and leave calendar.
#[async_trait]
pub trait StaffProvider: Send + Sync {
    /// Lists active staff who can perform a service, sorted by `sort_order`
    /// with the ID as tie-break.
    async fn list_staff_for_service(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<Vec<Staff>, StaffingError>;

    /// Gets a staff member by ID.
    async fn get_staff(&self, tenant_id: TenantId, id: StaffId) -> Result<Staff, StaffingError>;

    /// Lists all leaves for the tenant's staff on one date.
    async fn list_leaves_on(
        &self,
        tenant_id: TenantId,
        date: NaiveDate,
    ) -> Result<Vec<Leave>, StaffingError>;
}

#[derive(Debug, Default)]
struct StaffingState {
    staff: Vec<Staff>,
    leaves: Vec<(TenantId, Leave)>,
}

/// In-memory staffing provider for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryStaffing {
    state: Arc<RwLock<StaffingState>>,
}

impl MemoryStaffing {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a staff member.
    pub fn add_staff(&self, staff: Staff) {
        self.state.write().unwrap().staff.push(staff);
    }

    /// Adds a leave for a staff member.
    pub fn add_leave(&self, tenant_id: TenantId, leave: Leave) {
        self.state.write().unwrap().leaves.push((tenant_id, leave));
    }
}

impl Clone for MemoryStaffing {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl StaffProvider for MemoryStaffing {
    async fn list_staff_for_service(
        &self,
        tenant_id: TenantId,
        service_id: ServiceId,
    ) -> Result<Vec<Staff>, StaffingError> {
        let state = self.state.read().unwrap();
        let mut staff: Vec<_> = state
            .staff
            .iter()
            .filter(|s| s.tenant_id == tenant_id && s.active && s.can_perform(service_id))
            .cloned()
            .collect();
        staff.sort_by_key(|s| (s.sort_order, s.id.as_ulid()));
        Ok(staff)
    }

    async fn get_staff(&self, tenant_id: TenantId, id: StaffId) -> Result<Staff, StaffingError> {
        let state = self.state.read().unwrap();
        state
            .staff
            .iter()
            .find(|s| s.tenant_id == tenant_id && s.id == id)
            .cloned()
            .ok_or(StaffingError::StaffNotFound { tenant_id, id })
    }

    async fn list_leaves_on(
        &self,
        tenant_id: TenantId,
        date: NaiveDate,
    ) -> Result<Vec<Leave>, StaffingError> {
        let state = self.state.read().unwrap();
        Ok(state
            .leaves
            .iter()
            .filter(|(t, leave)| *t == tenant_id && leave.date == date)
            .map(|(_, leave)| *leave)
            .collect())
    }
}
