//! Error types for the catalog crate.

use bookline_core::{ProductId, ServiceId, TenantId};
use std::fmt;

/// Errors from catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Service not found for the tenant.
    ServiceNotFound { tenant_id: TenantId, id: ServiceId },
    /// Product not found for the tenant.
    ProductNotFound { tenant_id: TenantId, id: ProductId },
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceNotFound { tenant_id, id } => {
                write!(f, "service {id} not found for tenant {tenant_id}")
            }
            Self::ProductNotFound { tenant_id, id } => {
                write!(f, "product {id} not found for tenant {tenant_id}")
            }
            Self::StorageFailed { reason } => {
                write!(f, "catalog storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_not_found_display() {
        let err = CatalogError::ServiceNotFound {
            tenant_id: TenantId::new(),
            id: ServiceId::new(),
        };
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("svc_"));
    }

    #[test]
    fn storage_failed_display() {
        let err = CatalogError::StorageFailed {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }
}
