//! Shared harness for integration tests over the in-memory stores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use delivery_backend::domain::ports::{OrderLifecycle, OrderRepository, TransitionRequest};
use delivery_backend::domain::{Actor, MaintenanceConfig, Order, OrderId, OrderStatus};
use delivery_backend::outbound::memory::{
    InMemoryDriverAvailabilityRepository, InMemoryOrderRepository,
};
use delivery_backend::server::{ServiceBundle, build_services};
use delivery_backend::test_support::{MutableClock, new_order, user_id};

pub type MemoryBundle = ServiceBundle<InMemoryOrderRepository, InMemoryDriverAvailabilityRepository>;

/// Services wired over fresh in-memory stores and a test-controlled clock.
pub struct Harness {
    pub orders: Arc<InMemoryOrderRepository>,
    pub availability: Arc<InMemoryDriverAvailabilityRepository>,
    pub clock: Arc<MutableClock>,
    pub bundle: MemoryBundle,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let availability = Arc::new(InMemoryDriverAvailabilityRepository::new());
        let clock = Arc::new(MutableClock::new(now));
        let bundle = build_services(
            Arc::clone(&orders),
            Arc::clone(&availability),
            clock.clone(),
            MaintenanceConfig::default(),
        );
        Self {
            orders,
            availability,
            clock,
            bundle,
        }
    }

    /// Insert a pending order placed at `placed_at`.
    pub async fn place_order(&self, placed_at: DateTime<Utc>) -> Order {
        self.orders
            .insert(&new_order(placed_at))
            .await
            .expect("insert order")
    }

    /// Walk an order from `pending` up to `ready` as the restaurant.
    pub async fn make_ready(&self, order_id: OrderId) -> Order {
        let mut order = None;
        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            order = Some(
                self.transition(order_id, target, None)
                    .await
                    .expect("restaurant transition"),
            );
        }
        order.expect("at least one transition")
    }

    pub async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        reason: Option<&str>,
    ) -> Result<Order, delivery_backend::domain::Error> {
        self.bundle
            .http_state
            .lifecycle
            .apply_transition(TransitionRequest {
                order_id,
                target,
                actor: Actor::User(user_id(40)),
                reason: reason.map(str::to_owned),
            })
            .await
    }
}
