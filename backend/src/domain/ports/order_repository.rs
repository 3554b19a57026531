//! Port for order persistence: placement, guarded status writes, the driver
//! claim, archival, and the history log.
//!
//! Every mutating method is a single conditional write. The precondition is
//! restated inside the write so the store evaluates and applies it as one
//! indivisible step, and the history row lands in the same transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    DriverClaim, DriverReassignment, NewOrder, Order, OrderId, StatusChange, StatusHistoryEntry,
};

use super::{ConditionalWrite, define_port_error};

define_port_error! {
    /// Errors raised by order repository adapters.
    pub enum OrderRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "order repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "order repository query failed: {message}",
    }
}

/// Port for reading and conditionally writing orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new `pending` order, its items, and the placement history row.
    async fn insert(&self, order: &NewOrder) -> Result<Order, OrderRepositoryError>;

    /// Find an order by id.
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, OrderRepositoryError>;

    /// Apply a status change while the order still has `change.from` (and,
    /// when set, was placed before `change.placed_before`).
    async fn apply_status_change(
        &self,
        change: &StatusChange,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError>;

    /// Set the driver and move to `assigned` while the order is `ready`,
    /// unassigned, and not archived.
    async fn claim(
        &self,
        claim: &DriverClaim,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError>;

    /// Replace the driver while the order still has `reassignment.from`.
    async fn reassign_driver(
        &self,
        reassignment: &DriverReassignment,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError>;

    /// Set `archived_at` on a terminal, unarchived order completed before
    /// `completed_before`.
    async fn archive(
        &self,
        order_id: OrderId,
        completed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError>;

    /// Pending orders placed before `placed_before`, oldest first.
    async fn list_stale_pending(
        &self,
        placed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError>;

    /// Unarchived terminal orders completed before `completed_before`.
    async fn list_archivable(
        &self,
        completed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError>;

    /// Ready, unassigned, unarchived orders, oldest ready first.
    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>, OrderRepositoryError>;

    /// History rows for an order in insertion order.
    async fn history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, OrderRepositoryError>;
}

/// Fixture implementation for tests that do not exercise order persistence.
///
/// Every lookup misses and every conditional write reports a missing row.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureOrderRepository;

#[async_trait]
impl OrderRepository for FixtureOrderRepository {
    async fn insert(&self, _order: &NewOrder) -> Result<Order, OrderRepositoryError> {
        Err(OrderRepositoryError::query("fixture repository does not store orders"))
    }

    async fn find_by_id(&self, _order_id: OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(None)
    }

    async fn apply_status_change(
        &self,
        _change: &StatusChange,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }

    async fn claim(
        &self,
        _claim: &DriverClaim,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }

    async fn reassign_driver(
        &self,
        _reassignment: &DriverReassignment,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }

    async fn archive(
        &self,
        _order_id: OrderId,
        _completed_before: DateTime<Utc>,
        _at: DateTime<Utc>,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }

    async fn list_stale_pending(
        &self,
        _placed_before: DateTime<Utc>,
        _limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_archivable(
        &self,
        _completed_before: DateTime<Utc>,
        _limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_claimable(&self, _limit: i64) -> Result<Vec<Order>, OrderRepositoryError> {
        Ok(Vec::new())
    }

    async fn history(
        &self,
        _order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, OrderRepositoryError> {
        Ok(Vec::new())
    }
}
