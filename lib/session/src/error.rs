//! Error types for the session crate.

use std::fmt;

/// Errors from session storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The stored session changed since it was read; the write was refused.
    VersionConflict { expected: u64, found: u64 },
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionConflict { expected, found } => {
                write!(
                    f,
                    "session version conflict: store has {expected}, write carried {found}"
                )
            }
            Self::StorageFailed { reason } => {
                write!(f, "session storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conflict_display() {
        let err = SessionError::VersionConflict {
            expected: 4,
            found: 3,
        };
        assert!(err.to_string().contains("version conflict"));
        assert!(err.to_string().contains('4'));
    }
}
