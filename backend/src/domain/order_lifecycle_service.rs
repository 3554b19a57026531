//! Order state machine.
//!
//! Validates requested transitions against [`OrderStatus::successors`] and
//! hands the store a guarded [`StatusChange`] restating the status it
//! observed. A concurrent writer that moves the order first makes the write
//! match nothing, which surfaces as a conflict instead of an overwrite.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    ConditionalWrite, DriverAvailabilityRepository, OrderLifecycle, OrderRepository,
    TransitionRequest,
};
use crate::domain::store_errors::{map_availability_error, map_order_error};
use crate::domain::{
    Actor, DriverId, DriverReassignment, Error, Order, OrderId, OrderStatus, StatusChange,
    StatusHistoryEntry,
};

/// Extra precondition carried by sweep-issued transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionGuard {
    /// Status the order must currently have.
    pub expected_current: OrderStatus,
    /// The order must have been placed strictly before this instant.
    pub placed_before: Option<DateTime<Utc>>,
}

impl TransitionGuard {
    /// Guard on the current status only.
    pub fn expecting(expected_current: OrderStatus) -> Self {
        Self {
            expected_current,
            placed_before: None,
        }
    }
}

/// State machine over the order store.
#[derive(Clone)]
pub struct OrderLifecycleService<O, A> {
    orders: Arc<O>,
    availability: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<O, A> OrderLifecycleService<O, A> {
    /// Create a new service over the order and availability stores.
    pub fn new(orders: Arc<O>, availability: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            orders,
            availability,
            clock,
        }
    }
}

fn reject_transition(order: &Order, target: OrderStatus) -> Error {
    Error::invalid_state_transition(format!(
        "order {} cannot move from {} to {target}",
        order.id, order.status
    ))
}

fn normalise_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl<O, A> OrderLifecycleService<O, A>
where
    O: OrderRepository,
    A: DriverAvailabilityRepository,
{
    async fn load(&self, order_id: OrderId) -> Result<Order, Error> {
        self.orders
            .find_by_id(order_id)
            .await
            .map_err(|err| map_order_error("find_order", err))?
            .ok_or_else(|| Error::not_found(format!("order {order_id} not found")))
    }

    /// Apply a transition stamped `at`, only while the order still satisfies
    /// `guard`.
    ///
    /// Used by the maintenance sweeps so an order a vendor advanced between
    /// selection and write is reported as a conflict and left alone.
    pub async fn apply_guarded_transition(
        &self,
        request: TransitionRequest,
        guard: TransitionGuard,
        at: DateTime<Utc>,
    ) -> Result<Order, Error> {
        self.transition(request, Some(guard), at).await
    }

    async fn transition(
        &self,
        request: TransitionRequest,
        guard: Option<TransitionGuard>,
        at: DateTime<Utc>,
    ) -> Result<Order, Error> {
        let TransitionRequest {
            order_id,
            target,
            actor,
            reason,
        } = request;
        let order = self.load(order_id).await?;
        if let Some(expected) = guard.map(|g| g.expected_current) {
            if order.status != expected {
                debug!(order_id = %order_id, status = %order.status, expected = %expected, "guarded transition skipped");
                return Err(Error::conflict(format!(
                    "order {order_id} is {} rather than {expected}",
                    order.status
                )));
            }
        }
        if !order.status.can_transition_to(target) {
            debug!(order_id = %order_id, from = %order.status, to = %target, "transition rejected");
            return Err(reject_transition(&order, target));
        }
        // Only `ready -> assigned` reaches this point.
        if target == OrderStatus::Assigned {
            return Err(Error::invalid_request(
                "orders become assigned through a driver claim or an administrative reassignment",
            ));
        }
        let reason = normalise_reason(reason);
        if target == OrderStatus::Cancelled && reason.is_none() {
            return Err(Error::invalid_request("cancellation requires a reason"));
        }

        let (cancellation_reason, note) = if target == OrderStatus::Cancelled {
            (reason, None)
        } else {
            (None, reason)
        };
        let change = StatusChange {
            order_id,
            from: order.status,
            to: target,
            actor,
            at,
            cancellation_reason,
            note,
            placed_before: guard.and_then(|g| g.placed_before),
        };

        let updated = match self
            .orders
            .apply_status_change(&change)
            .await
            .map_err(|err| map_order_error("apply_status_change", err))?
        {
            ConditionalWrite::Applied(updated) => updated,
            ConditionalWrite::PreconditionFailed => {
                debug!(order_id = %order_id, from = %change.from, to = %target, "transition lost a race");
                return Err(Error::conflict(format!(
                    "order {order_id} changed while moving to {target}"
                )));
            }
            ConditionalWrite::Missing => {
                return Err(Error::not_found(format!("order {order_id} not found")));
            }
        };

        info!(order_id = %order_id, from = %change.from, to = %target, actor = %actor, "order status changed");
        if let Some(driver_id) = updated.driver_id.filter(|_| target.is_terminal()) {
            self.release_driver(driver_id, order_id).await;
        }
        Ok(updated)
    }

    async fn release_driver(&self, driver_id: DriverId, order_id: OrderId) {
        if let Err(err) = self.availability.detach_order(driver_id, order_id).await {
            warn!(driver_id = %driver_id, order_id = %order_id, error = %err, "failed to clear current order");
        }
    }

    async fn track_driver(&self, driver_id: DriverId, order_id: OrderId) {
        if let Err(err) = self.availability.attach_order(driver_id, order_id).await {
            warn!(driver_id = %driver_id, order_id = %order_id, error = %err, "failed to record current order");
        }
    }

    /// Soft-archive a terminal order completed before `completed_before`,
    /// stamping `archived_at` with `at`.
    pub async fn archive(
        &self,
        order_id: OrderId,
        completed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Order, Error> {
        match self
            .orders
            .archive(order_id, completed_before, at)
            .await
            .map_err(|err| map_order_error("archive_order", err))?
        {
            ConditionalWrite::Applied(order) => {
                debug!(order_id = %order_id, "order archived");
                Ok(order)
            }
            ConditionalWrite::PreconditionFailed => Err(Error::conflict(format!(
                "order {order_id} is not an unarchived order completed before {completed_before}"
            ))),
            ConditionalWrite::Missing => {
                Err(Error::not_found(format!("order {order_id} not found")))
            }
        }
    }

    /// Pending orders placed before `placed_before`.
    pub async fn list_stale_pending(
        &self,
        placed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, Error> {
        self.orders
            .list_stale_pending(placed_before, limit)
            .await
            .map_err(|err| map_order_error("list_stale_pending", err))
    }

    /// Unarchived terminal orders completed before `completed_before`.
    pub async fn list_archivable(
        &self,
        completed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, Error> {
        self.orders
            .list_archivable(completed_before, limit)
            .await
            .map_err(|err| map_order_error("list_archivable", err))
    }

    /// Current availability of a driver, used to validate reassignments.
    async fn ensure_driver_known(&self, driver_id: DriverId) -> Result<(), Error> {
        self.availability
            .find(driver_id)
            .await
            .map_err(|err| map_availability_error("find_driver", err))?
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("driver {driver_id} not found")))
    }
}

#[async_trait]
impl<O, A> OrderLifecycle for OrderLifecycleService<O, A>
where
    O: OrderRepository,
    A: DriverAvailabilityRepository,
{
    async fn apply_transition(&self, request: TransitionRequest) -> Result<Order, Error> {
        self.transition(request, None, self.clock.utc()).await
    }

    async fn reassign_driver(
        &self,
        order_id: OrderId,
        driver_id: DriverId,
        actor: Actor,
    ) -> Result<Order, Error> {
        let order = self.load(order_id).await?;
        if !matches!(
            order.status,
            OrderStatus::Ready | OrderStatus::Assigned | OrderStatus::InTransit
        ) {
            return Err(Error::invalid_state_transition(format!(
                "order {order_id} is {} and cannot take a driver",
                order.status
            )));
        }
        self.ensure_driver_known(driver_id).await?;
        if order.driver_id == Some(driver_id) {
            return Ok(order);
        }

        let reassignment = DriverReassignment {
            order_id,
            from: order.status,
            driver_id,
            actor,
            at: self.clock.utc(),
        };
        let updated = match self
            .orders
            .reassign_driver(&reassignment)
            .await
            .map_err(|err| map_order_error("reassign_driver", err))?
        {
            ConditionalWrite::Applied(updated) => updated,
            ConditionalWrite::PreconditionFailed => {
                return Err(Error::conflict(format!(
                    "order {order_id} changed during reassignment"
                )));
            }
            ConditionalWrite::Missing => {
                return Err(Error::not_found(format!("order {order_id} not found")));
            }
        };

        info!(
            order_id = %order_id,
            previous_driver = ?order.driver_id.map(DriverId::get),
            driver_id = %driver_id,
            actor = %actor,
            "driver reassigned"
        );
        if let Some(previous) = order.driver_id {
            self.release_driver(previous, order_id).await;
        }
        self.track_driver(driver_id, order_id).await;
        Ok(updated)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Order, Error> {
        self.load(order_id).await
    }

    async fn history(&self, order_id: OrderId) -> Result<Vec<StatusHistoryEntry>, Error> {
        self.load(order_id).await?;
        self.orders
            .history(order_id)
            .await
            .map_err(|err| map_order_error("order_history", err))
    }
}

#[cfg(test)]
#[path = "order_lifecycle_service_tests.rs"]
mod tests;
