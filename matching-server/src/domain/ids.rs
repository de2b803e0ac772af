//! Opaque identifier types.

use std::fmt;

/// Maximum identifier length in bytes.
const MAX_ID_LEN: usize = 128;

/// Error returned when parsing an invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

fn check_id(kind: &'static str, s: &str) -> Result<(), InvalidId> {
    if s.trim().is_empty() {
        return Err(InvalidId {
            kind,
            reason: "cannot be empty",
        });
    }
    if s.len() > MAX_ID_LEN {
        return Err(InvalidId {
            kind,
            reason: "longer than 128 bytes",
        });
    }
    if s.chars().any(|c| c.is_control()) {
        return Err(InvalidId {
            kind,
            reason: "contains control characters",
        });
    }
    Ok(())
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, rejecting empty or oversized values.
            pub fn new(s: impl Into<String>) -> Result<Self, InvalidId> {
                let s = s.into();
                check_id($kind, &s)?;
                Ok(Self(s))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Unique identifier of a trip; the key of a matching session.
    TripId,
    "trip id"
);

opaque_id!(
    /// Identifier of the rider who requested a trip.
    RiderId,
    "rider id"
);

opaque_id!(
    /// Identifier of a driver. Ordered lexicographically for tie-breaks.
    DriverId,
    "driver id"
);

opaque_id!(
    /// Identifier of a vehicle.
    VehicleId,
    "vehicle id"
);
