//! Postgres implementations of the platform's provider contracts.
//!
//! One repository per contract, each a thin `PgPool` wrapper. Queries are
//! runtime `query_as` into `FromRow` row structs; rows convert into domain
//! types through `try_into_*` methods so malformed stored data surfaces as
//! a decode error rather than a panic.

mod catalog;
mod ledger;
mod session;
mod settings;
mod staffing;

pub use catalog::PgCatalog;
pub use ledger::PgLedger;
pub use session::PgSessionStore;
pub use settings::PgSettings;
pub use staffing::PgStaffing;

use std::fmt;
use std::io;

/// Wraps an invalid stored value as an sqlx decode error.
pub(crate) fn decode_error(what: &str, value: &str, e: impl fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("invalid {what} '{value}': {e}"),
    )))
}
