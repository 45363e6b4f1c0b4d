//! Strongly-typed ID types for domain entities.
//!
//! IDs minted by bookline use ULID (Universally Unique Lexicographically
//! Sortable Identifier) format, providing both uniqueness and temporal
//! ordering. End users are the exception: messaging channels assign their
//! identifiers, so [`ChannelUserId`] wraps the channel-provided string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Creates an ID from a ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the prefix used for display formatting.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Try with prefix first
                let prefix_with_underscore = concat!($prefix, "_");
                let ulid_str = if let Some(stripped) = s.strip_prefix(prefix_with_underscore) {
                    stripped
                } else {
                    // Try parsing as raw ULID
                    s
                };

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<Ulid> for $name {
            fn from(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }

        impl From<$name> for Ulid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a tenant (a salon or shop on the platform).
    TenantId,
    "tnt"
);

define_id!(
    /// Unique identifier for a service category.
    CategoryId,
    "cat"
);

define_id!(
    /// Unique identifier for a bookable service item.
    ServiceId,
    "svc"
);

define_id!(
    /// Unique identifier for a staff member.
    StaffId,
    "stf"
);

define_id!(
    /// Unique identifier for a sellable product.
    ProductId,
    "prd"
);

define_id!(
    /// Unique identifier for a coupon.
    CouponId,
    "cpn"
);

define_id!(
    /// Unique identifier for a confirmed booking.
    BookingId,
    "bkg"
);

define_id!(
    /// Unique identifier for a product order.
    OrderId,
    "ord"
);

define_id!(
    /// Single-use token handed to the end user for cancelling a booking.
    CancelToken,
    "cxl"
);

/// Identifier a messaging channel assigns to an end user.
///
/// The channel owns this value; bookline treats it as an opaque string and
/// never mints one itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelUserId(String);

impl ChannelUserId {
    /// Creates a channel user ID from a channel-provided string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelUserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ChannelUserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
