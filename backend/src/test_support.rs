//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for tests and behind the `test-support` feature.

use std::sync::Mutex;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::{
    DriverId, NewOrder, Order, OrderId, OrderLineItem, OrderStatus, OrderTimestamps, OrderTotals,
    RestaurantId, UserId,
};

/// Clock whose reading only moves when a test moves it.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(TimeDelta::minutes(minutes));
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// UTC instant on a fixed test day.
///
/// # Panics
/// Panics when the hour or minute is out of range.
pub fn at_hm(hour: u32, minute: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).single() {
        Some(instant) => instant,
        None => panic!("invalid test time {hour:02}:{minute:02}"),
    }
}

/// Wrap a raw order id, panicking on invalid input.
pub fn order_id(raw: i64) -> OrderId {
    match OrderId::new(raw) {
        Ok(id) => id,
        Err(err) => panic!("{err}"),
    }
}

/// Wrap a raw driver id, panicking on invalid input.
pub fn driver_id(raw: i64) -> DriverId {
    match DriverId::new(raw) {
        Ok(id) => id,
        Err(err) => panic!("{err}"),
    }
}

/// Wrap a raw user id, panicking on invalid input.
pub fn user_id(raw: i64) -> UserId {
    match UserId::new(raw) {
        Ok(id) => id,
        Err(err) => panic!("{err}"),
    }
}

/// A single-item order placed at `placed_at`.
pub fn new_order(placed_at: DateTime<Utc>) -> NewOrder {
    let items = vec![OrderLineItem {
        name: "Margherita".to_owned(),
        unit_price_cents: 1_250,
        quantity: 2,
    }];
    let restaurant = match RestaurantId::new(40) {
        Ok(id) => id,
        Err(err) => panic!("{err}"),
    };
    match NewOrder::new(
        user_id(500),
        restaurant,
        OrderTotals::new(2_500, 200, 299, 0),
        items,
        placed_at,
    ) {
        Ok(order) => order,
        Err(err) => panic!("{err}"),
    }
}

fn lifecycle_rank(status: OrderStatus) -> usize {
    crate::domain::ALL_STATUSES
        .iter()
        .position(|candidate| *candidate == status)
        .unwrap_or_default()
}

/// An order record in `status`, with timestamps consistent with it.
pub fn order_in_status(id: i64, status: OrderStatus, placed_at: DateTime<Utc>) -> Order {
    let step = TimeDelta::minutes(1);
    let mut timestamps = OrderTimestamps {
        placed_at: Some(placed_at),
        ..OrderTimestamps::default()
    };
    let reached = |target: OrderStatus| {
        status != OrderStatus::Cancelled && lifecycle_rank(status) >= lifecycle_rank(target)
    };
    if reached(OrderStatus::Confirmed) {
        timestamps.confirmed_at = Some(placed_at + step);
    }
    if reached(OrderStatus::Ready) {
        timestamps.ready_at = Some(placed_at + step * 3);
    }
    if reached(OrderStatus::InTransit) {
        timestamps.picked_up_at = Some(placed_at + step * 5);
    }
    if status == OrderStatus::Delivered {
        timestamps.delivered_at = Some(placed_at + step * 6);
    }
    let cancellation_reason = (status == OrderStatus::Cancelled).then(|| {
        timestamps.cancelled_at = Some(placed_at + step);
        "customer request".to_owned()
    });
    Order {
        id: order_id(id),
        customer_id: user_id(500),
        restaurant_id: match RestaurantId::new(40) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        },
        driver_id: status.has_driver().then(|| driver_id(7)),
        status,
        totals: OrderTotals::new(2_500, 200, 299, 0),
        timestamps,
        cancellation_reason,
        archived_at: None,
    }
}
