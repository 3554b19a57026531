//! Driving port for driver heartbeats and the offline switch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DriverAvailability, DriverId, Error};

/// Availability use-cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriverAvailabilityCommand: Send + Sync {
    /// Record a heartbeat; `at` defaults to the service clock.
    async fn heartbeat(
        &self,
        driver_id: DriverId,
        at: Option<DateTime<Utc>>,
    ) -> Result<DriverAvailability, Error>;

    /// Mark the driver unavailable.
    async fn go_offline(&self, driver_id: DriverId) -> Result<DriverAvailability, Error>;

    /// Fetch the driver's availability record.
    async fn get(&self, driver_id: DriverId) -> Result<DriverAvailability, Error>;
}

/// Fixture implementation for handler tests that do not track drivers.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDriverAvailabilityCommand;

#[async_trait]
impl DriverAvailabilityCommand for FixtureDriverAvailabilityCommand {
    async fn heartbeat(
        &self,
        driver_id: DriverId,
        at: Option<DateTime<Utc>>,
    ) -> Result<DriverAvailability, Error> {
        Ok(DriverAvailability::first_heartbeat(
            driver_id,
            at.unwrap_or_else(Utc::now),
        ))
    }

    async fn go_offline(&self, driver_id: DriverId) -> Result<DriverAvailability, Error> {
        Err(Error::not_found(format!("driver {driver_id} has no availability record")))
    }

    async fn get(&self, driver_id: DriverId) -> Result<DriverAvailability, Error> {
        Err(Error::not_found(format!("driver {driver_id} has no availability record")))
    }
}
