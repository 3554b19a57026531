//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain records validate
//! identifiers and status names and fail with a message on corrupt rows.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{driver_availability, order_items, order_status_history, orders};
use crate::domain::{
    Actor, DriverAvailability, DriverId, NewStatusHistoryEntry, Order, OrderId, OrderStatus,
    OrderTimestamps, OrderTotals, ParseOrderStatusError, RestaurantId, StatusChange,
    StatusHistoryEntry, TimestampField, UserId,
};

/// Row struct for reading from the orders table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OrderRow {
    pub id: i64,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub driver_id: Option<i64>,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub placed_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = String;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id).map_err(|err| err.to_string())?,
            customer_id: UserId::new(row.customer_id).map_err(|err| err.to_string())?,
            restaurant_id: RestaurantId::new(row.restaurant_id).map_err(|err| err.to_string())?,
            driver_id: row
                .driver_id
                .map(DriverId::new)
                .transpose()
                .map_err(|err| err.to_string())?,
            status: row
                .status
                .parse()
                .map_err(|err: ParseOrderStatusError| err.to_string())?,
            totals: OrderTotals {
                subtotal_cents: row.subtotal_cents,
                tax_cents: row.tax_cents,
                delivery_fee_cents: row.delivery_fee_cents,
                discount_cents: row.discount_cents,
                total_cents: row.total_cents,
            },
            timestamps: OrderTimestamps {
                placed_at: row.placed_at,
                confirmed_at: row.confirmed_at,
                ready_at: row.ready_at,
                picked_up_at: row.picked_up_at,
                delivered_at: row.delivered_at,
                cancelled_at: row.cancelled_at,
            },
            cancellation_reason: row.cancellation_reason,
            archived_at: row.archived_at,
        })
    }
}

/// Insertable struct for placing an order.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub(crate) struct NewOrderRow {
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub status: &'static str,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub placed_at: Option<DateTime<Utc>>,
}

/// Changeset applied by a status transition. `None` fields are left alone.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = orders)]
pub(crate) struct StatusChangeset<'a> {
    pub status: &'a str,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<&'a str>,
}

impl<'a> From<&'a StatusChange> for StatusChangeset<'a> {
    fn from(change: &'a StatusChange) -> Self {
        let stamp = |field: TimestampField| {
            (TimestampField::for_target(change.to) == Some(field)).then_some(change.at)
        };
        Self {
            status: change.to.as_str(),
            confirmed_at: stamp(TimestampField::Confirmed),
            ready_at: stamp(TimestampField::Ready),
            picked_up_at: stamp(TimestampField::PickedUp),
            delivered_at: stamp(TimestampField::Delivered),
            cancelled_at: stamp(TimestampField::Cancelled),
            cancellation_reason: change
                .cancellation_reason
                .as_deref()
                .filter(|_| change.to == OrderStatus::Cancelled),
        }
    }
}

/// Insertable struct for line items.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = order_items)]
pub(crate) struct NewOrderItemRow<'a> {
    pub order_id: i64,
    pub name: &'a str,
    pub unit_price_cents: i64,
    pub quantity: i32,
}

/// Row struct for reading history entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = order_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StatusHistoryRow {
    pub id: i64,
    pub order_id: i64,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor_user_id: Option<i64>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<StatusHistoryRow> for StatusHistoryEntry {
    type Error = String;

    fn try_from(row: StatusHistoryRow) -> Result<Self, Self::Error> {
        let parse = |value: &str| value.parse::<OrderStatus>().map_err(|err| err.to_string());
        Ok(Self {
            id: row.id,
            order_id: OrderId::new(row.order_id).map_err(|err| err.to_string())?,
            from_status: row.from_status.as_deref().map(parse).transpose()?,
            to_status: parse(&row.to_status)?,
            actor: Actor::from_user_id(
                row.actor_user_id
                    .map(UserId::new)
                    .transpose()
                    .map_err(|err| err.to_string())?,
            ),
            note: row.note,
            recorded_at: row.recorded_at,
        })
    }
}

/// Insertable struct for history entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = order_status_history)]
pub(crate) struct NewStatusHistoryRow<'a> {
    pub order_id: i64,
    pub from_status: Option<&'a str>,
    pub to_status: &'a str,
    pub actor_user_id: Option<i64>,
    pub note: Option<&'a str>,
    pub recorded_at: DateTime<Utc>,
}

impl<'a> From<&'a NewStatusHistoryEntry> for NewStatusHistoryRow<'a> {
    fn from(entry: &'a NewStatusHistoryEntry) -> Self {
        Self {
            order_id: entry.order_id.get(),
            from_status: entry.from_status.map(OrderStatus::as_str),
            to_status: entry.to_status.as_str(),
            actor_user_id: entry.actor.user_id().map(UserId::get),
            note: entry.note.as_deref(),
            recorded_at: entry.recorded_at,
        }
    }
}

/// Row struct for the driver availability table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = driver_availability)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DriverAvailabilityRow {
    pub driver_id: i64,
    pub is_available: bool,
    pub last_heartbeat_at: DateTime<Utc>,
    pub current_order_id: Option<i64>,
}

impl TryFrom<DriverAvailabilityRow> for DriverAvailability {
    type Error = String;

    fn try_from(row: DriverAvailabilityRow) -> Result<Self, Self::Error> {
        Ok(Self {
            driver_id: DriverId::new(row.driver_id).map_err(|err| err.to_string())?,
            is_available: row.is_available,
            last_heartbeat_at: row.last_heartbeat_at,
            current_order_id: row
                .current_order_id
                .map(OrderId::new)
                .transpose()
                .map_err(|err| err.to_string())?,
        })
    }
}
