//! Error types for the availability crate.

use bookline_core::TenantId;
use std::fmt;

/// Errors from availability calculation and settings lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    /// Tenant booking settings are unusable (inverted hours, zero
    /// granularity, malformed break window).
    InvalidSettings { reason: String },
    /// The service cannot produce slots (zero duration).
    InvalidService { reason: String },
    /// No booking settings stored for the tenant.
    SettingsNotFound { tenant_id: TenantId },
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for AvailabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSettings { reason } => {
                write!(f, "invalid booking settings: {reason}")
            }
            Self::InvalidService { reason } => {
                write!(f, "service cannot be scheduled: {reason}")
            }
            Self::SettingsNotFound { tenant_id } => {
                write!(f, "no booking settings for tenant {tenant_id}")
            }
            Self::StorageFailed { reason } => {
                write!(f, "settings storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for AvailabilityError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_settings_display() {
        let err = AvailabilityError::InvalidSettings {
            reason: "close before open".to_string(),
        };
        assert!(err.to_string().contains("close before open"));
    }
}
