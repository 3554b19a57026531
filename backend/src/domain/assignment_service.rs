//! Assignment coordinator: the driver self-claim.
//!
//! A claim is one conditional write. The store sets the driver and the
//! `assigned` status only while the order is `ready`, unassigned, and not
//! archived, so the row count of that single write decides the winner. Nothing
//! here reads the order first to decide whether to write.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    ConditionalWrite, DriverAvailabilityRepository, OrderAssignment, OrderRepository,
};
use crate::domain::store_errors::map_order_error;
use crate::domain::{Actor, DriverClaim, DriverId, Error, Order, OrderId};

/// Largest page accepted by [`OrderAssignment::list_claimable`].
pub const MAX_CLAIMABLE_PAGE: i64 = 100;

/// Assignment coordinator over the order store.
#[derive(Clone)]
pub struct AssignmentService<O, A> {
    orders: Arc<O>,
    availability: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<O, A> AssignmentService<O, A> {
    /// Create a new coordinator.
    pub fn new(orders: Arc<O>, availability: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            orders,
            availability,
            clock,
        }
    }
}

fn already_claimed(order_id: OrderId) -> Error {
    Error::conflict(format!("order {order_id} is no longer available to claim"))
        .with_details(json!({ "reason": "already_claimed" }))
}

#[async_trait]
impl<O, A> OrderAssignment for AssignmentService<O, A>
where
    O: OrderRepository,
    A: DriverAvailabilityRepository,
{
    async fn claim(&self, order_id: OrderId, driver_id: DriverId) -> Result<Order, Error> {
        let claim = DriverClaim {
            order_id,
            driver_id,
            actor: Actor::User(driver_id.as_user()),
            at: self.clock.utc(),
        };
        let order = match self
            .orders
            .claim(&claim)
            .await
            .map_err(|err| map_order_error("claim_order", err))?
        {
            ConditionalWrite::Applied(order) => order,
            ConditionalWrite::PreconditionFailed => {
                debug!(order_id = %order_id, driver_id = %driver_id, "claim lost");
                return Err(already_claimed(order_id));
            }
            ConditionalWrite::Missing => {
                return Err(Error::not_found(format!("order {order_id} not found")));
            }
        };

        info!(order_id = %order_id, driver_id = %driver_id, "order claimed");
        if let Err(err) = self.availability.attach_order(driver_id, order_id).await {
            warn!(driver_id = %driver_id, order_id = %order_id, error = %err, "failed to record current order");
        }
        Ok(order)
    }

    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>, Error> {
        if !(1..=MAX_CLAIMABLE_PAGE).contains(&limit) {
            return Err(Error::invalid_request(format!(
                "limit must be between 1 and {MAX_CLAIMABLE_PAGE}"
            ))
            .with_details(json!({ "field": "limit", "value": limit })));
        }
        self.orders
            .list_claimable(limit)
            .await
            .map_err(|err| map_order_error("list_claimable", err))
    }
}

#[cfg(test)]
#[path = "assignment_service_tests.rs"]
mod tests;
