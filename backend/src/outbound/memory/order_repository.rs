//! In-memory order store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{ConditionalWrite, OrderRepository, OrderRepositoryError};
use crate::domain::{
    DriverClaim, DriverReassignment, NewOrder, NewStatusHistoryEntry, Order, OrderId,
    OrderLineItem, OrderStatus, OrderTimestamps, StatusChange, StatusHistoryEntry,
};

#[derive(Debug, Default)]
struct Tables {
    last_order_id: i64,
    last_history_id: i64,
    orders: BTreeMap<OrderId, Order>,
    items: BTreeMap<OrderId, Vec<OrderLineItem>>,
    history: Vec<StatusHistoryEntry>,
}

impl Tables {
    fn append_history(&mut self, entry: NewStatusHistoryEntry) {
        self.last_history_id += 1;
        self.history.push(StatusHistoryEntry {
            id: self.last_history_id,
            order_id: entry.order_id,
            from_status: entry.from_status,
            to_status: entry.to_status,
            actor: entry.actor,
            note: entry.note,
            recorded_at: entry.recorded_at,
        });
    }

    /// Run `mutate` on the order when `precondition` holds, appending the
    /// history row it returns.
    fn conditional_update(
        &mut self,
        order_id: OrderId,
        precondition: impl FnOnce(&Order) -> bool,
        mutate: impl FnOnce(&mut Order) -> Option<NewStatusHistoryEntry>,
    ) -> ConditionalWrite<Order> {
        let Some(order) = self.orders.get_mut(&order_id) else {
            return ConditionalWrite::Missing;
        };
        if !precondition(order) {
            return ConditionalWrite::PreconditionFailed;
        }
        let entry = mutate(order);
        let updated = order.clone();
        if let Some(entry) = entry {
            self.append_history(entry);
        }
        ConditionalWrite::Applied(updated)
    }
}

/// Order store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    tables: Mutex<Tables>,
}

impl InMemoryOrderRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, OrderRepositoryError> {
        self.tables
            .lock()
            .map_err(|_| OrderRepositoryError::query("order tables lock poisoned"))
    }

    /// Line items stored for an order.
    pub fn items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>, OrderRepositoryError> {
        Ok(self.lock()?.items.get(&order_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert(&self, order: &NewOrder) -> Result<Order, OrderRepositoryError> {
        let mut tables = self.lock()?;
        tables.last_order_id += 1;
        let id = OrderId::new(tables.last_order_id)
            .map_err(|err| OrderRepositoryError::query(err.to_string()))?;
        let record = Order {
            id,
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            driver_id: None,
            status: OrderStatus::Pending,
            totals: order.totals,
            timestamps: OrderTimestamps {
                placed_at: Some(order.placed_at),
                ..OrderTimestamps::default()
            },
            cancellation_reason: None,
            archived_at: None,
        };
        tables.orders.insert(id, record.clone());
        tables.items.insert(id, order.items.clone());
        tables.append_history(order.placement_entry(id));
        Ok(record)
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(self.lock()?.orders.get(&order_id).cloned())
    }

    async fn apply_status_change(
        &self,
        change: &StatusChange,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.conditional_update(
            change.order_id,
            |order| change.matches(order),
            |order| {
                if let Some(next) = order.applying(change) {
                    *order = next;
                }
                Some(change.history_entry())
            },
        ))
    }

    async fn claim(
        &self,
        claim: &DriverClaim,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.conditional_update(
            claim.order_id,
            Order::is_claimable,
            |order| {
                order.driver_id = Some(claim.driver_id);
                order.status = OrderStatus::Assigned;
                Some(claim.history_entry())
            },
        ))
    }

    async fn reassign_driver(
        &self,
        reassignment: &DriverReassignment,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.conditional_update(
            reassignment.order_id,
            |order| order.status == reassignment.from && !order.status.is_terminal(),
            |order| {
                order.driver_id = Some(reassignment.driver_id);
                order.status = reassignment.resulting_status();
                Some(reassignment.history_entry())
            },
        ))
    }

    async fn archive(
        &self,
        order_id: OrderId,
        completed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.conditional_update(
            order_id,
            |order| is_archivable(order, completed_before),
            |order| {
                order.archived_at = Some(at);
                None
            },
        ))
    }

    async fn list_stale_pending(
        &self,
        placed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError> {
        let tables = self.lock()?;
        let mut stale: Vec<&Order> = tables
            .orders
            .values()
            .filter(|order| {
                order.status == OrderStatus::Pending
                    && order
                        .timestamps
                        .placed_at
                        .is_some_and(|placed| placed < placed_before)
            })
            .collect();
        stale.sort_by_key(|order| (order.timestamps.placed_at, order.id));
        Ok(take(stale.into_iter().map(|order| order.id), limit))
    }

    async fn list_archivable(
        &self,
        completed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError> {
        let tables = self.lock()?;
        let ids = tables
            .orders
            .values()
            .filter(|order| is_archivable(order, completed_before))
            .map(|order| order.id);
        Ok(take(ids, limit))
    }

    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>, OrderRepositoryError> {
        let tables = self.lock()?;
        let mut claimable: Vec<&Order> = tables
            .orders
            .values()
            .filter(|order| order.is_claimable())
            .collect();
        claimable.sort_by_key(|order| (order.timestamps.ready_at, order.id));
        Ok(take(claimable.into_iter().cloned(), limit))
    }

    async fn history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, OrderRepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .history
            .iter()
            .filter(|entry| entry.order_id == order_id)
            .cloned()
            .collect())
    }
}

fn is_archivable(order: &Order, completed_before: DateTime<Utc>) -> bool {
    order.status.is_terminal()
        && order.archived_at.is_none()
        && order
            .timestamps
            .completed_at()
            .is_some_and(|completed| completed < completed_before)
}

fn take<T>(rows: impl Iterator<Item = T>, limit: i64) -> Vec<T> {
    rows.take(usize::try_from(limit).unwrap_or_default()).collect()
}
