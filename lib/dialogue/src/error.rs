//! Error types for the dialogue crate.
//!
//! Almost everything that goes wrong in a dialogue turn is expressed as a
//! reply to the user (re-prompt, try-again-later) with the session left in
//! a safe state. [`EngineError`] covers only the faults the engine cannot
//! absorb: the session store itself failing.

use bookline_session::SessionError;
use std::fmt;

/// Errors the engine cannot turn into a user-facing reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The session store failed; the turn cannot be processed safely.
    Store { source: SessionError },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { source } => write!(f, "session store failed: {source}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store { source } => Some(source),
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(source: SessionError) -> Self {
        Self::Store { source }
    }
}
