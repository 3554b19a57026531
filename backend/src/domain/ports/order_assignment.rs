//! Driving port for the driver claim.

use async_trait::async_trait;

use crate::domain::{DriverId, Error, Order, OrderId};

/// Assignment use-cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderAssignment: Send + Sync {
    /// Claim a ready, unassigned order for `driver_id`.
    ///
    /// At most one of any number of concurrent claims on the same order
    /// succeeds; the rest fail with [`crate::domain::ErrorCode::Conflict`].
    async fn claim(&self, order_id: OrderId, driver_id: DriverId) -> Result<Order, Error>;

    /// Orders currently open for claiming, oldest first.
    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>, Error>;
}

/// Fixture implementation for handler tests that do not claim orders.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureOrderAssignment;

#[async_trait]
impl OrderAssignment for FixtureOrderAssignment {
    async fn claim(&self, order_id: OrderId, _driver_id: DriverId) -> Result<Order, Error> {
        Err(Error::not_found(format!("order {order_id} not found")))
    }

    async fn list_claimable(&self, _limit: i64) -> Result<Vec<Order>, Error> {
        Ok(Vec::new())
    }
}
