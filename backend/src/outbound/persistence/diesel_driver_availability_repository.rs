//! PostgreSQL-backed `DriverAvailabilityRepository` implementation.
//!
//! Heartbeats are an upsert keyed on the driver. Every other write is a
//! single guarded `UPDATE ... RETURNING`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{
    ConditionalWrite, DriverAvailabilityRepository, DriverAvailabilityRepositoryError,
};
use crate::domain::{DriverAvailability, DriverId, OrderId};

use super::diesel_basic_error_mapping::{map_diesel_error, map_pool_error};
use super::models::DriverAvailabilityRow;
use super::pool::{DbPool, PoolError};
use super::schema::driver_availability;

/// Diesel-backed implementation of the availability repository port.
#[derive(Clone)]
pub struct DieselDriverAvailabilityRepository {
    pool: DbPool,
}

impl DieselDriverAvailabilityRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> DriverAvailabilityRepositoryError {
    map_pool_error(error, DriverAvailabilityRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> DriverAvailabilityRepositoryError {
    map_diesel_error(
        error,
        DriverAvailabilityRepositoryError::query,
        DriverAvailabilityRepositoryError::connection,
    )
}

fn to_record(
    row: DriverAvailabilityRow,
) -> Result<DriverAvailability, DriverAvailabilityRepositoryError> {
    DriverAvailability::try_from(row).map_err(DriverAvailabilityRepositoryError::query)
}

/// Turn the outcome of a guarded update into a [`ConditionalWrite`].
async fn settle(
    conn: &mut AsyncPgConnection,
    driver_id: i64,
    updated: Option<DriverAvailabilityRow>,
) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
    if let Some(row) = updated {
        return to_record(row).map(ConditionalWrite::Applied);
    }
    let present = diesel::select(exists(
        driver_availability::table.filter(driver_availability::driver_id.eq(driver_id)),
    ))
    .get_result::<bool>(conn)
    .await
    .map_err(diesel_error)?;
    Ok(if present {
        ConditionalWrite::PreconditionFailed
    } else {
        ConditionalWrite::Missing
    })
}

#[async_trait]
impl DriverAvailabilityRepository for DieselDriverAvailabilityRepository {
    async fn record_heartbeat(
        &self,
        driver_id: DriverId,
        at: DateTime<Utc>,
    ) -> Result<DriverAvailability, DriverAvailabilityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = DriverAvailabilityRow {
            driver_id: driver_id.get(),
            is_available: true,
            last_heartbeat_at: at,
            current_order_id: None,
        };
        let stored = diesel::insert_into(driver_availability::table)
            .values(&row)
            .on_conflict(driver_availability::driver_id)
            .do_update()
            .set((
                driver_availability::is_available.eq(true),
                driver_availability::last_heartbeat_at.eq(at),
            ))
            .returning(DriverAvailabilityRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        to_record(stored)
    }

    async fn find(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<DriverAvailability>, DriverAvailabilityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = driver_availability::table
            .filter(driver_availability::driver_id.eq(driver_id.get()))
            .select(DriverAvailabilityRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(to_record).transpose()
    }

    async fn set_unavailable(
        &self,
        driver_id: DriverId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = driver_id.get();
        let updated = diesel::update(
            driver_availability::table.filter(driver_availability::driver_id.eq(id)),
        )
        .set(driver_availability::is_available.eq(false))
        .returning(DriverAvailabilityRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(diesel_error)?;
        settle(&mut conn, id, updated).await
    }

    async fn expire_if_stale(
        &self,
        driver_id: DriverId,
        heartbeat_before: DateTime<Utc>,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = driver_id.get();
        let updated = diesel::update(
            driver_availability::table
                .filter(driver_availability::driver_id.eq(id))
                .filter(driver_availability::is_available.eq(true))
                .filter(driver_availability::last_heartbeat_at.lt(heartbeat_before)),
        )
        .set(driver_availability::is_available.eq(false))
        .returning(DriverAvailabilityRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(diesel_error)?;
        settle(&mut conn, id, updated).await
    }

    async fn list_stale(
        &self,
        heartbeat_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DriverId>, DriverAvailabilityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let ids = driver_availability::table
            .filter(driver_availability::is_available.eq(true))
            .filter(driver_availability::last_heartbeat_at.lt(heartbeat_before))
            .order(driver_availability::driver_id.asc())
            .limit(limit)
            .select(driver_availability::driver_id)
            .load::<i64>(&mut conn)
            .await
            .map_err(diesel_error)?;
        ids.into_iter()
            .map(|id| {
                DriverId::new(id)
                    .map_err(|err| DriverAvailabilityRepositoryError::query(err.to_string()))
            })
            .collect()
    }

    async fn attach_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = driver_id.get();
        let updated = diesel::update(
            driver_availability::table.filter(driver_availability::driver_id.eq(id)),
        )
        .set(driver_availability::current_order_id.eq(order_id.get()))
        .returning(DriverAvailabilityRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(diesel_error)?;
        settle(&mut conn, id, updated).await
    }

    async fn detach_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let id = driver_id.get();
        let updated = diesel::update(
            driver_availability::table
                .filter(driver_availability::driver_id.eq(id))
                .filter(driver_availability::current_order_id.eq(order_id.get())),
        )
        .set(driver_availability::current_order_id.eq(None::<i64>))
        .returning(DriverAvailabilityRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(diesel_error)?;
        settle(&mut conn, id, updated).await
    }
}
