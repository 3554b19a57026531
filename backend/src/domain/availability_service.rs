//! Driver availability service: heartbeats, going offline, staleness.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{
    ConditionalWrite, DriverAvailabilityCommand, DriverAvailabilityRepository,
};
use crate::domain::store_errors::map_availability_error;
use crate::domain::{DriverAvailability, DriverId, Error};

fn no_record(driver_id: DriverId) -> Error {
    Error::not_found(format!("driver {driver_id} has no availability record"))
}

/// Availability service over the availability store.
#[derive(Clone)]
pub struct AvailabilityService<A> {
    availability: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<A> AvailabilityService<A> {
    /// Create a new service.
    pub fn new(availability: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            availability,
            clock,
        }
    }
}

impl<A> AvailabilityService<A>
where
    A: DriverAvailabilityRepository,
{
    /// Flip the driver to unavailable if its heartbeat predates
    /// `heartbeat_before`. Returns whether the row changed.
    pub async fn expire_if_stale(
        &self,
        driver_id: DriverId,
        heartbeat_before: DateTime<Utc>,
    ) -> Result<bool, Error> {
        match self
            .availability
            .expire_if_stale(driver_id, heartbeat_before)
            .await
            .map_err(|err| map_availability_error("expire_if_stale", err))?
        {
            ConditionalWrite::Applied(_) => {
                debug!(driver_id = %driver_id, "driver marked unavailable after missed heartbeats");
                Ok(true)
            }
            ConditionalWrite::PreconditionFailed => Ok(false),
            ConditionalWrite::Missing => Err(no_record(driver_id)),
        }
    }

    /// Available drivers whose heartbeat predates `heartbeat_before`.
    pub async fn list_stale(
        &self,
        heartbeat_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DriverId>, Error> {
        self.availability
            .list_stale(heartbeat_before, limit)
            .await
            .map_err(|err| map_availability_error("list_stale_drivers", err))
    }
}

#[async_trait]
impl<A> DriverAvailabilityCommand for AvailabilityService<A>
where
    A: DriverAvailabilityRepository,
{
    async fn heartbeat(
        &self,
        driver_id: DriverId,
        at: Option<DateTime<Utc>>,
    ) -> Result<DriverAvailability, Error> {
        let at = at.unwrap_or_else(|| self.clock.utc());
        self.availability
            .record_heartbeat(driver_id, at)
            .await
            .map_err(|err| map_availability_error("record_heartbeat", err))
    }

    async fn go_offline(&self, driver_id: DriverId) -> Result<DriverAvailability, Error> {
        match self
            .availability
            .set_unavailable(driver_id)
            .await
            .map_err(|err| map_availability_error("set_unavailable", err))?
        {
            ConditionalWrite::Applied(record) => Ok(record),
            ConditionalWrite::PreconditionFailed | ConditionalWrite::Missing => {
                Err(no_record(driver_id))
            }
        }
    }

    async fn get(&self, driver_id: DriverId) -> Result<DriverAvailability, Error> {
        self.availability
            .find(driver_id)
            .await
            .map_err(|err| map_availability_error("find_driver", err))?
            .ok_or_else(|| no_record(driver_id))
    }
}
