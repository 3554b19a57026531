//! PostgreSQL-backed `OrderRepository` implementation using Diesel ORM.
//!
//! Each conditional write is one `UPDATE ... WHERE <precondition> RETURNING`
//! statement. The row count decides the outcome; when nothing matched, an
//! existence probe separates a failed precondition from an unknown order.
//! History rows are inserted in the same transaction as the write they
//! describe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{ConditionalWrite, OrderRepository, OrderRepositoryError};
use crate::domain::{
    DriverClaim, DriverReassignment, NewOrder, NewStatusHistoryEntry, Order, OrderId,
    OrderStatus, StatusChange, StatusHistoryEntry,
};

use super::diesel_basic_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    NewOrderItemRow, NewOrderRow, NewStatusHistoryRow, OrderRow, StatusChangeset,
    StatusHistoryRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{order_items, order_status_history, orders};

const TERMINAL: [&str; 2] = [
    OrderStatus::Delivered.as_str(),
    OrderStatus::Cancelled.as_str(),
];

/// Diesel-backed implementation of the order repository port.
#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> OrderRepositoryError {
    map_pool_error(error, OrderRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> OrderRepositoryError {
    map_diesel_error(
        error,
        OrderRepositoryError::query,
        OrderRepositoryError::connection,
    )
}

fn to_order(row: OrderRow) -> Result<Order, OrderRepositoryError> {
    Order::try_from(row).map_err(OrderRepositoryError::query)
}

fn to_order_ids(ids: Vec<i64>) -> Result<Vec<OrderId>, OrderRepositoryError> {
    ids.into_iter()
        .map(|id| OrderId::new(id).map_err(|err| OrderRepositoryError::query(err.to_string())))
        .collect()
}

fn to_write(
    write: ConditionalWrite<OrderRow>,
) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
    match write {
        ConditionalWrite::Applied(row) => to_order(row).map(ConditionalWrite::Applied),
        ConditionalWrite::PreconditionFailed => Ok(ConditionalWrite::PreconditionFailed),
        ConditionalWrite::Missing => Ok(ConditionalWrite::Missing),
    }
}

/// Settle a conditional update: record history when it applied, otherwise
/// probe for the row to tell a failed precondition from a missing order.
async fn settle(
    conn: &mut AsyncPgConnection,
    order_id: i64,
    updated: Option<OrderRow>,
    entry: Option<&NewStatusHistoryEntry>,
) -> Result<ConditionalWrite<OrderRow>, diesel::result::Error> {
    if let Some(row) = updated {
        if let Some(entry) = entry {
            diesel::insert_into(order_status_history::table)
                .values(NewStatusHistoryRow::from(entry))
                .execute(conn)
                .await?;
        }
        return Ok(ConditionalWrite::Applied(row));
    }

    let present = diesel::select(exists(orders::table.filter(orders::id.eq(order_id))))
        .get_result::<bool>(conn)
        .await?;
    Ok(if present {
        ConditionalWrite::PreconditionFailed
    } else {
        ConditionalWrite::Missing
    })
}

#[async_trait]
impl OrderRepository for DieselOrderRepository {
    async fn insert(&self, order: &NewOrder) -> Result<Order, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let new_row = NewOrderRow {
            customer_id: order.customer_id.get(),
            restaurant_id: order.restaurant_id.get(),
            status: OrderStatus::Pending.as_str(),
            subtotal_cents: order.totals.subtotal_cents,
            tax_cents: order.totals.tax_cents,
            delivery_fee_cents: order.totals.delivery_fee_cents,
            discount_cents: order.totals.discount_cents,
            total_cents: order.totals.total_cents,
            placed_at: Some(order.placed_at),
        };

        let row = conn
            .transaction(|conn| {
                async move {
                    let row = diesel::insert_into(orders::table)
                        .values(&new_row)
                        .returning(OrderRow::as_returning())
                        .get_result(conn)
                        .await?;

                    let items: Vec<NewOrderItemRow<'_>> = order
                        .items
                        .iter()
                        .map(|item| NewOrderItemRow {
                            order_id: row.id,
                            name: item.name.as_str(),
                            unit_price_cents: item.unit_price_cents,
                            quantity: item.quantity,
                        })
                        .collect();
                    diesel::insert_into(order_items::table)
                        .values(&items)
                        .execute(conn)
                        .await?;

                    let order_id = OrderId::new(row.id).map_err(|err| {
                        diesel::result::Error::DeserializationError(Box::new(err))
                    })?;
                    let entry = order.placement_entry(order_id);
                    diesel::insert_into(order_status_history::table)
                        .values(NewStatusHistoryRow::from(&entry))
                        .execute(conn)
                        .await?;

                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        to_order(row)
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = orders::table
            .filter(orders::id.eq(order_id.get()))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(to_order).transpose()
    }

    async fn apply_status_change(
        &self,
        change: &StatusChange,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = change.order_id.get();
        let from = change.from.as_str();
        let changeset = StatusChangeset::from(change);
        let entry = change.history_entry();

        let write = conn
            .transaction(|conn| {
                async move {
                    let matching = orders::table
                        .filter(orders::id.eq(id))
                        .filter(orders::status.eq(from));
                    let updated = match change.placed_before {
                        Some(cutoff) => {
                            diesel::update(matching.filter(orders::placed_at.lt(cutoff)))
                                .set(&changeset)
                                .returning(OrderRow::as_returning())
                                .get_result(conn)
                                .await
                                .optional()?
                        }
                        None => {
                            diesel::update(matching)
                                .set(&changeset)
                                .returning(OrderRow::as_returning())
                                .get_result(conn)
                                .await
                                .optional()?
                        }
                    };
                    settle(conn, id, updated, Some(&entry)).await
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        to_write(write)
    }

    async fn claim(
        &self,
        claim: &DriverClaim,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = claim.order_id.get();
        let driver_id = claim.driver_id.get();
        let entry = claim.history_entry();

        let write = conn
            .transaction(|conn| {
                async move {
                    let updated = diesel::update(
                        orders::table
                            .filter(orders::id.eq(id))
                            .filter(orders::status.eq(OrderStatus::Ready.as_str()))
                            .filter(orders::driver_id.is_null())
                            .filter(orders::archived_at.is_null()),
                    )
                    .set((
                        orders::driver_id.eq(driver_id),
                        orders::status.eq(OrderStatus::Assigned.as_str()),
                    ))
                    .returning(OrderRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?;
                    settle(conn, id, updated, Some(&entry)).await
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        to_write(write)
    }

    async fn reassign_driver(
        &self,
        reassignment: &DriverReassignment,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = reassignment.order_id.get();
        let from = reassignment.from.as_str();
        let driver_id = reassignment.driver_id.get();
        let status = reassignment.resulting_status().as_str();
        let entry = reassignment.history_entry();

        let write = conn
            .transaction(|conn| {
                async move {
                    let updated = diesel::update(
                        orders::table
                            .filter(orders::id.eq(id))
                            .filter(orders::status.eq(from))
                            .filter(orders::status.ne_all(TERMINAL)),
                    )
                    .set((orders::driver_id.eq(driver_id), orders::status.eq(status)))
                    .returning(OrderRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?;
                    settle(conn, id, updated, Some(&entry)).await
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        to_write(write)
    }

    async fn archive(
        &self,
        order_id: OrderId,
        completed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<ConditionalWrite<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = order_id.get();

        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(id))
                .filter(orders::archived_at.is_null())
                .filter(orders::status.eq_any(TERMINAL))
                .filter(
                    orders::delivered_at
                        .lt(completed_before)
                        .or(orders::cancelled_at.lt(completed_before)),
                ),
        )
        .set(orders::archived_at.eq(at))
        .returning(OrderRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(diesel_error)?;

        let write = settle(&mut conn, id, updated, None)
            .await
            .map_err(diesel_error)?;
        to_write(write)
    }

    async fn list_stale_pending(
        &self,
        placed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let ids = orders::table
            .filter(orders::status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::placed_at.lt(placed_before))
            .order((orders::placed_at.asc(), orders::id.asc()))
            .limit(limit)
            .select(orders::id)
            .load::<i64>(&mut conn)
            .await
            .map_err(diesel_error)?;
        to_order_ids(ids)
    }

    async fn list_archivable(
        &self,
        completed_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderId>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let ids = orders::table
            .filter(orders::archived_at.is_null())
            .filter(orders::status.eq_any(TERMINAL))
            .filter(
                orders::delivered_at
                    .lt(completed_before)
                    .or(orders::cancelled_at.lt(completed_before)),
            )
            .order(orders::id.asc())
            .limit(limit)
            .select(orders::id)
            .load::<i64>(&mut conn)
            .await
            .map_err(diesel_error)?;
        to_order_ids(ids)
    }

    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = orders::table
            .filter(orders::status.eq(OrderStatus::Ready.as_str()))
            .filter(orders::driver_id.is_null())
            .filter(orders::archived_at.is_null())
            .order((orders::ready_at.asc(), orders::id.asc()))
            .limit(limit)
            .select(OrderRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(to_order).collect()
    }

    async fn history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, OrderRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = order_status_history::table
            .filter(order_status_history::order_id.eq(order_id.get()))
            .order(order_status_history::id.asc())
            .select(StatusHistoryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter()
            .map(|row| StatusHistoryEntry::try_from(row).map_err(OrderRepositoryError::query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    //! Error mapping coverage; query behaviour is exercised against the
    //! in-memory adapter, which implements the same preconditions.

    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn pool_checkout_failures_are_connection_errors() {
        let err = pool_error(PoolError::checkout("timed out"));
        assert!(matches!(err, OrderRepositoryError::Connection { .. }));
    }

    #[rstest]
    fn unique_violations_are_query_errors() {
        let err = diesel_error(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_owned()),
        ));
        assert!(matches!(err, OrderRepositoryError::Query { .. }));
    }

    #[rstest]
    fn corrupt_identifiers_are_reported() {
        let err = to_order_ids(vec![3, 0]).expect_err("zero id");
        assert!(err.to_string().contains("order id must be a positive integer"));
    }

    #[rstest]
    fn terminal_names_match_the_status_enum() {
        assert_eq!(TERMINAL, ["delivered", "cancelled"]);
    }
}
