//! Identifier primitives for orders, drivers, and acting users.
//!
//! Identifiers are positive 64-bit integers issued by the relational store.
//! Constructors reject zero and negative values so malformed input is caught
//! before any store call is made.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors returned by identifier constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierValidationError {
    /// The raw value was zero or negative.
    NotPositive {
        /// Identifier kind, used in messages.
        kind: &'static str,
        /// Rejected raw value.
        value: i64,
    },
}

impl fmt::Display for IdentifierValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { kind, value } => {
                write!(f, "{kind} id must be a positive integer, got {value}")
            }
        }
    }
}

impl std::error::Error for IdentifierValidationError {}

macro_rules! positive_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Validate and wrap a raw store identifier.
            pub fn new(value: i64) -> Result<Self, IdentifierValidationError> {
                if value <= 0 {
                    return Err(IdentifierValidationError::NotPositive {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Raw value as stored in the database.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = IdentifierValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_identifier!(
    /// Order identity.
    OrderId,
    "order"
);
positive_identifier!(
    /// Driver identity, as referenced by orders and availability rows.
    DriverId,
    "driver"
);
positive_identifier!(
    /// Identity of a human user acting on an order (vendor, driver, admin).
    UserId,
    "user"
);
positive_identifier!(
    /// Restaurant fulfilling an order.
    RestaurantId,
    "restaurant"
);

impl DriverId {
    /// Drivers are marketplace users; a driver acts under the same id.
    pub fn as_user(self) -> UserId {
        UserId(self.0)
    }
}

/// Who performed a transition, recorded in the status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "userId", rename_all = "snake_case")]
pub enum Actor {
    /// A maintenance sweep or other autonomous process.
    System,
    /// A signed-in user.
    User(UserId),
}

impl Actor {
    /// User id for persistence, `None` for the system actor.
    pub fn user_id(self) -> Option<UserId> {
        match self {
            Self::System => None,
            Self::User(id) => Some(id),
        }
    }

    /// Rebuild an actor from a nullable persisted user id.
    pub fn from_user_id(user_id: Option<UserId>) -> Self {
        user_id.map_or(Self::System, Self::User)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}
