//! Error types for the staffing crate.

use bookline_core::{StaffId, TenantId};
use std::fmt;

/// Errors from staffing lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffingError {
    /// Staff member not found for the tenant.
    StaffNotFound { tenant_id: TenantId, id: StaffId },
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for StaffingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaffNotFound { tenant_id, id } => {
                write!(f, "staff {id} not found for tenant {tenant_id}")
            }
            Self::StorageFailed { reason } => {
                write!(f, "staffing storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StaffingError {}
