//! Order aggregate, line items, and the append-only status history.
//!
//! Purpose: describe an order as the lifecycle core sees it. Records are
//! plain data; every mutation is expressed as a write request
//! ([`StatusChange`], [`DriverClaim`], [`DriverReassignment`]) that a store
//! applies atomically and only while the request's precondition still holds.
//!
//! Invariants:
//! - `driver_id` is `None` in every pre-claim status.
//! - Each lifecycle timestamp is written at most once.
//! - Terminal orders never change again; archival only sets `archived_at`,
//!   which is store metadata rather than a lifecycle field.

mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Actor, DriverId, OrderId, RestaurantId, UserId};

pub use status::{ALL_STATUSES, OrderStatus, ParseOrderStatusError};

/// Monetary totals in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Sum of line totals.
    pub subtotal_cents: i64,
    /// Tax charged on the subtotal.
    pub tax_cents: i64,
    /// Delivery fee.
    pub delivery_fee_cents: i64,
    /// Discount subtracted from the total.
    pub discount_cents: i64,
    /// Amount charged to the customer.
    pub total_cents: i64,
}

impl OrderTotals {
    /// Build totals, deriving `total_cents` from the components.
    pub fn new(subtotal_cents: i64, tax_cents: i64, delivery_fee_cents: i64, discount_cents: i64) -> Self {
        Self {
            subtotal_cents,
            tax_cents,
            delivery_fee_cents,
            discount_cents,
            total_cents: subtotal_cents + tax_cents + delivery_fee_cents - discount_cents,
        }
    }
}

/// Lifecycle timestamp columns that a transition may stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    /// Set on `confirmed`.
    Confirmed,
    /// Set on `ready`.
    Ready,
    /// Set on `in_transit`.
    PickedUp,
    /// Set on `delivered`.
    Delivered,
    /// Set on `cancelled`.
    Cancelled,
}

impl TimestampField {
    /// Timestamp stamped when an order enters `status`, if any.
    pub fn for_target(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Confirmed => Some(Self::Confirmed),
            OrderStatus::Ready => Some(Self::Ready),
            OrderStatus::InTransit => Some(Self::PickedUp),
            OrderStatus::Delivered => Some(Self::Delivered),
            OrderStatus::Cancelled => Some(Self::Cancelled),
            OrderStatus::Pending | OrderStatus::Preparing | OrderStatus::Assigned => None,
        }
    }
}

/// Per-transition timestamps, each written at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTimestamps {
    /// When the customer placed the order.
    pub placed_at: Option<DateTime<Utc>>,
    /// When the vendor confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the kitchen marked it ready.
    pub ready_at: Option<DateTime<Utc>>,
    /// When the driver picked it up.
    pub picked_up_at: Option<DateTime<Utc>>,
    /// When it was delivered.
    pub delivered_at: Option<DateTime<Utc>>,
    /// When it was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl OrderTimestamps {
    fn slot(&mut self, field: TimestampField) -> &mut Option<DateTime<Utc>> {
        match field {
            TimestampField::Confirmed => &mut self.confirmed_at,
            TimestampField::Ready => &mut self.ready_at,
            TimestampField::PickedUp => &mut self.picked_up_at,
            TimestampField::Delivered => &mut self.delivered_at,
            TimestampField::Cancelled => &mut self.cancelled_at,
        }
    }

    /// Stamp `field` with `at` unless it is already set.
    pub fn stamp(&mut self, field: TimestampField, at: DateTime<Utc>) {
        self.slot(field).get_or_insert(at);
    }

    /// Terminal timestamp used by the archive sweep.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at.or(self.cancelled_at)
    }
}

/// Durable order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identity.
    pub id: OrderId,
    /// Customer who placed the order.
    pub customer_id: UserId,
    /// Restaurant fulfilling the order.
    pub restaurant_id: RestaurantId,
    /// Claiming driver; `None` until claimed.
    pub driver_id: Option<DriverId>,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Monetary totals.
    pub totals: OrderTotals,
    /// Lifecycle timestamps.
    pub timestamps: OrderTimestamps,
    /// Reason recorded on cancellation.
    pub cancellation_reason: Option<String>,
    /// Soft-archive marker set by the archive sweep.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether a driver may claim this order right now.
    pub fn is_claimable(&self) -> bool {
        self.status == OrderStatus::Ready && self.driver_id.is_none() && self.archived_at.is_none()
    }

    /// Apply a status change in memory, returning `None` when its guard does
    /// not hold for this record.
    pub fn applying(&self, change: &StatusChange) -> Option<Self> {
        if !change.matches(self) {
            return None;
        }
        let mut next = self.clone();
        next.status = change.to;
        if let Some(field) = TimestampField::for_target(change.to) {
            next.timestamps.stamp(field, change.at);
        }
        if change.to == OrderStatus::Cancelled {
            next.cancellation_reason.clone_from(&change.cancellation_reason);
        }
        Some(next)
    }
}

/// Line item captured at order creation. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    /// Menu item name at the time of ordering.
    pub name: String,
    /// Unit price in minor units at the time of ordering.
    pub unit_price_cents: i64,
    /// Quantity ordered, at least one.
    pub quantity: i32,
}

impl OrderLineItem {
    /// Unit price multiplied by quantity.
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Validation errors for [`NewOrder::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewOrderValidationError {
    /// An order needs at least one line item.
    NoItems,
    /// A line item had a blank name.
    BlankItemName {
        /// Offending item position.
        index: usize,
    },
    /// A line item quantity was below one.
    InvalidQuantity {
        /// Offending item position.
        index: usize,
    },
}

impl std::fmt::Display for NewOrderValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "order must contain at least one item"),
            Self::BlankItemName { index } => write!(f, "item {index} must have a name"),
            Self::InvalidQuantity { index } => {
                write!(f, "item {index} quantity must be at least one")
            }
        }
    }
}

impl std::error::Error for NewOrderValidationError {}

/// Store request inserting a freshly placed, `pending` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Customer placing the order.
    pub customer_id: UserId,
    /// Restaurant fulfilling the order.
    pub restaurant_id: RestaurantId,
    /// Monetary totals.
    pub totals: OrderTotals,
    /// Line items.
    pub items: Vec<OrderLineItem>,
    /// Placement time.
    pub placed_at: DateTime<Utc>,
}

impl NewOrder {
    /// Validate line items and build the insert request.
    pub fn new(
        customer_id: UserId,
        restaurant_id: RestaurantId,
        totals: OrderTotals,
        items: Vec<OrderLineItem>,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, NewOrderValidationError> {
        if items.is_empty() {
            return Err(NewOrderValidationError::NoItems);
        }
        for (index, item) in items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(NewOrderValidationError::BlankItemName { index });
            }
            if item.quantity < 1 {
                return Err(NewOrderValidationError::InvalidQuantity { index });
            }
        }
        Ok(Self {
            customer_id,
            restaurant_id,
            totals,
            items,
            placed_at,
        })
    }

    /// History row recording placement once the store has assigned `order_id`.
    pub fn placement_entry(&self, order_id: OrderId) -> NewStatusHistoryEntry {
        NewStatusHistoryEntry {
            order_id,
            from_status: None,
            to_status: OrderStatus::Pending,
            actor: Actor::User(self.customer_id),
            note: None,
            recorded_at: self.placed_at,
        }
    }
}

/// Guarded status change applied as one atomic write plus one history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Target order.
    pub order_id: OrderId,
    /// Status the row must still have for the write to apply.
    pub from: OrderStatus,
    /// New status.
    pub to: OrderStatus,
    /// Who requested the change.
    pub actor: Actor,
    /// Transition time.
    pub at: DateTime<Utc>,
    /// Required when `to` is `cancelled`.
    pub cancellation_reason: Option<String>,
    /// Free-form note kept in the history row.
    pub note: Option<String>,
    /// Optional restated sweep predicate: the order must have been placed
    /// strictly before this instant.
    pub placed_before: Option<DateTime<Utc>>,
}

impl StatusChange {
    /// Whether the guard holds for `order`.
    pub fn matches(&self, order: &Order) -> bool {
        order.id == self.order_id
            && order.status == self.from
            && self.placed_before.is_none_or(|cutoff| {
                order.timestamps.placed_at.is_some_and(|placed| placed < cutoff)
            })
    }

    /// History row recorded alongside the change.
    pub fn history_entry(&self) -> NewStatusHistoryEntry {
        NewStatusHistoryEntry {
            order_id: self.order_id,
            from_status: Some(self.from),
            to_status: self.to,
            actor: self.actor,
            note: self.note.clone().or_else(|| self.cancellation_reason.clone()),
            recorded_at: self.at,
        }
    }
}

/// Driver self-claim request. Applies only to `ready`, unassigned,
/// unarchived orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverClaim {
    /// Target order.
    pub order_id: OrderId,
    /// Claiming driver.
    pub driver_id: DriverId,
    /// Actor recorded in history.
    pub actor: Actor,
    /// Claim time.
    pub at: DateTime<Utc>,
}

impl DriverClaim {
    /// Note stored in the history row.
    pub const HISTORY_NOTE: &'static str = "driver self-assigned";

    /// History row recorded alongside a successful claim.
    pub fn history_entry(&self) -> NewStatusHistoryEntry {
        NewStatusHistoryEntry {
            order_id: self.order_id,
            from_status: Some(OrderStatus::Ready),
            to_status: OrderStatus::Assigned,
            actor: self.actor,
            note: Some(Self::HISTORY_NOTE.to_owned()),
            recorded_at: self.at,
        }
    }
}

/// Administrative driver change, guarded on the status observed by the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReassignment {
    /// Target order.
    pub order_id: OrderId,
    /// Status the row must still have; never terminal.
    pub from: OrderStatus,
    /// Driver taking over.
    pub driver_id: DriverId,
    /// Administrator performing the change.
    pub actor: Actor,
    /// Change time.
    pub at: DateTime<Utc>,
}

impl DriverReassignment {
    /// Status after the change: `ready` orders become `assigned`, others keep
    /// their status.
    pub fn resulting_status(&self) -> OrderStatus {
        if self.from == OrderStatus::Ready {
            OrderStatus::Assigned
        } else {
            self.from
        }
    }

    /// History row recorded alongside the change.
    pub fn history_entry(&self) -> NewStatusHistoryEntry {
        NewStatusHistoryEntry {
            order_id: self.order_id,
            from_status: Some(self.from),
            to_status: self.resulting_status(),
            actor: self.actor,
            note: Some(format!("driver reassigned to {}", self.driver_id)),
            recorded_at: self.at,
        }
    }
}

/// History row to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatusHistoryEntry {
    /// Order the row belongs to.
    pub order_id: OrderId,
    /// Prior status; `None` for the placement row.
    pub from_status: Option<OrderStatus>,
    /// New status.
    pub to_status: OrderStatus,
    /// Actor.
    pub actor: Actor,
    /// Optional note.
    pub note: Option<String>,
    /// Transition time.
    pub recorded_at: DateTime<Utc>,
}

/// Persisted history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    /// Store-assigned sequence number, increasing per insert.
    pub id: i64,
    /// Order the row belongs to.
    pub order_id: OrderId,
    /// Prior status; `None` for the placement row.
    pub from_status: Option<OrderStatus>,
    /// New status.
    pub to_status: OrderStatus,
    /// Actor.
    pub actor: Actor,
    /// Optional note.
    pub note: Option<String>,
    /// Transition time.
    pub recorded_at: DateTime<Utc>,
}
