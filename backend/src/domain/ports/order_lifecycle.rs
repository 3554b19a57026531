//! Driving port for order lifecycle changes and reads.

use async_trait::async_trait;

use crate::domain::{
    Actor, DriverId, Error, Order, OrderId, OrderStatus, StatusHistoryEntry,
};

/// Request to move an order to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Target order.
    pub order_id: OrderId,
    /// Requested status.
    pub target: OrderStatus,
    /// Who is asking.
    pub actor: Actor,
    /// Cancellation reason, or a free-form note for other targets.
    pub reason: Option<String>,
}

/// Lifecycle use-cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderLifecycle: Send + Sync {
    /// Apply a permitted transition.
    async fn apply_transition(&self, request: TransitionRequest) -> Result<Order, Error>;

    /// Administratively replace the driver on a ready or in-flight order.
    async fn reassign_driver(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        actor: Actor,
    ) -> Result<Order, Error>;

    /// Fetch an order.
    async fn get_order(&self, order_id: OrderId) -> Result<Order, Error>;

    /// Status history in insertion order.
    async fn history(&self, order_id: OrderId) -> Result<Vec<StatusHistoryEntry>, Error>;
}

/// Fixture implementation for handler tests that do not touch orders.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureOrderLifecycle;

#[async_trait]
impl OrderLifecycle for FixtureOrderLifecycle {
    async fn apply_transition(&self, request: TransitionRequest) -> Result<Order, Error> {
        Err(Error::not_found(format!("order {} not found", request.order_id)))
    }

    async fn reassign_driver(
        &self,
        order_id: OrderId,
        _driver_id: DriverId,
        _actor: Actor,
    ) -> Result<Order, Error> {
        Err(Error::not_found(format!("order {order_id} not found")))
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Order, Error> {
        Err(Error::not_found(format!("order {order_id} not found")))
    }

    async fn history(&self, _order_id: OrderId) -> Result<Vec<StatusHistoryEntry>, Error> {
        Ok(Vec::new())
    }
}
