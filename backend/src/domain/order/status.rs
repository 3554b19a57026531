//! Order status enumeration and the lifecycle transition table.
//!
//! The table is the single authority on which status changes are legal. Every
//! write path (generic transitions, claims, reassignment, sweeps) consults it
//! through [`OrderStatus::can_transition_to`] instead of comparing strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by the customer, awaiting vendor confirmation.
    Pending,
    /// Accepted by the vendor.
    Confirmed,
    /// Kitchen is preparing the order.
    Preparing,
    /// Ready for pickup; claimable while no driver is set.
    Ready,
    /// A driver owns the delivery.
    Assigned,
    /// Picked up and on the way to the customer.
    InTransit,
    /// Handed over to the customer. Terminal.
    Delivered,
    /// Abandoned before delivery. Terminal.
    Cancelled,
}

/// Statuses in lifecycle order.
pub const ALL_STATUSES: [OrderStatus; 8] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Assigned,
    OrderStatus::InTransit,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];

impl OrderStatus {
    /// Permitted successor statuses.
    pub fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Preparing, Self::Cancelled],
            Self::Preparing => &[Self::Ready, Self::Cancelled],
            Self::Ready => &[Self::Assigned, Self::Cancelled],
            Self::Assigned => &[Self::InTransit, Self::Cancelled],
            Self::InTransit => &[Self::Delivered, Self::Cancelled],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Whether `target` is a permitted successor of `self`.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// Delivered and cancelled orders accept no further changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Statuses in which a driver reference is present.
    pub fn has_driver(self) -> bool {
        matches!(self, Self::Assigned | Self::InTransit | Self::Delivered)
    }

    /// Stable wire and column representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Assigned => "assigned",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse error for [`OrderStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOrderStatusError {
    /// Rejected input.
    pub input: String,
}

impl fmt::Display for ParseOrderStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid order status: {}", self.input)
    }
}

impl std::error::Error for ParseOrderStatusError {}

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ParseOrderStatusError {
                input: value.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(OrderStatus::Pending, OrderStatus::Confirmed)]
    #[case(OrderStatus::Confirmed, OrderStatus::Preparing)]
    #[case(OrderStatus::Preparing, OrderStatus::Ready)]
    #[case(OrderStatus::Ready, OrderStatus::Assigned)]
    #[case(OrderStatus::Assigned, OrderStatus::InTransit)]
    #[case(OrderStatus::InTransit, OrderStatus::Delivered)]
    fn forward_path_is_permitted(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    fn every_non_terminal_status_can_be_cancelled() {
        for status in ALL_STATUSES.into_iter().filter(|s| !s.is_terminal()) {
            assert!(status.can_transition_to(OrderStatus::Cancelled), "{status}");
        }
    }

    #[rstest]
    fn terminal_statuses_have_no_successors() {
        for status in ALL_STATUSES.into_iter().filter(|s| s.is_terminal()) {
            assert!(status.successors().is_empty(), "{status}");
        }
    }

    #[rstest]
    #[case(OrderStatus::Pending, OrderStatus::Delivered)]
    #[case(OrderStatus::Ready, OrderStatus::InTransit)]
    #[case(OrderStatus::Assigned, OrderStatus::Ready)]
    #[case(OrderStatus::Confirmed, OrderStatus::Confirmed)]
    fn skips_and_reversals_are_rejected(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        assert!(!from.can_transition_to(to));
    }

    #[rstest]
    fn parses_every_wire_name() {
        for status in ALL_STATUSES {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("driver_assigned".parse::<OrderStatus>().is_err());
    }

    #[rstest]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::InTransit).expect("serialises");
        assert_eq!(json, "\"in_transit\"");
    }
}
