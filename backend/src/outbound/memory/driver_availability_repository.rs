//! In-memory driver availability store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    ConditionalWrite, DriverAvailabilityRepository, DriverAvailabilityRepositoryError,
};
use crate::domain::{DriverAvailability, DriverId, OrderId};

type Rows = BTreeMap<DriverId, DriverAvailability>;

/// Availability rows held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDriverAvailabilityRepository {
    rows: Mutex<Rows>,
}

impl InMemoryDriverAvailabilityRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rows>, DriverAvailabilityRepositoryError> {
        self.rows
            .lock()
            .map_err(|_| DriverAvailabilityRepositoryError::query("availability lock poisoned"))
    }

    fn update_where(
        &self,
        driver_id: DriverId,
        precondition: impl FnOnce(&DriverAvailability) -> bool,
        mutate: impl FnOnce(&mut DriverAvailability),
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        let mut rows = self.lock()?;
        let Some(row) = rows.get_mut(&driver_id) else {
            return Ok(ConditionalWrite::Missing);
        };
        if !precondition(row) {
            return Ok(ConditionalWrite::PreconditionFailed);
        }
        mutate(row);
        Ok(ConditionalWrite::Applied(row.clone()))
    }
}

#[async_trait]
impl DriverAvailabilityRepository for InMemoryDriverAvailabilityRepository {
    async fn record_heartbeat(
        &self,
        driver_id: DriverId,
        at: DateTime<Utc>,
    ) -> Result<DriverAvailability, DriverAvailabilityRepositoryError> {
        let mut rows = self.lock()?;
        let row = rows
            .entry(driver_id)
            .and_modify(|row| row.beat(at))
            .or_insert_with(|| DriverAvailability::first_heartbeat(driver_id, at));
        Ok(row.clone())
    }

    async fn find(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<DriverAvailability>, DriverAvailabilityRepositoryError> {
        Ok(self.lock()?.get(&driver_id).cloned())
    }

    async fn set_unavailable(
        &self,
        driver_id: DriverId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        self.update_where(driver_id, |_| true, |row| row.is_available = false)
    }

    async fn expire_if_stale(
        &self,
        driver_id: DriverId,
        heartbeat_before: DateTime<Utc>,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        self.update_where(
            driver_id,
            |row| row.is_stale(heartbeat_before),
            |row| row.is_available = false,
        )
    }

    async fn list_stale(
        &self,
        heartbeat_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DriverId>, DriverAvailabilityRepositoryError> {
        let rows = self.lock()?;
        Ok(rows
            .values()
            .filter(|row| row.is_stale(heartbeat_before))
            .map(|row| row.driver_id)
            .take(usize::try_from(limit).unwrap_or_default())
            .collect())
    }

    async fn attach_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        self.update_where(
            driver_id,
            |_| true,
            |row| row.current_order_id = Some(order_id),
        )
    }

    async fn detach_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        self.update_where(
            driver_id,
            |row| row.current_order_id == Some(order_id),
            |row| row.current_order_id = None,
        )
    }
}
