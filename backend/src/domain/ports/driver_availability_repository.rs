//! Port for driver availability rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DriverAvailability, DriverId, OrderId};

use super::{ConditionalWrite, define_port_error};

define_port_error! {
    /// Errors raised by driver availability repository adapters.
    pub enum DriverAvailabilityRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "driver availability repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "driver availability repository query failed: {message}",
    }
}

/// Port for reading and updating driver availability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriverAvailabilityRepository: Send + Sync {
    /// Upsert the driver's row: available, heartbeat stamped with `at`.
    async fn record_heartbeat(
        &self,
        driver_id: DriverId,
        at: DateTime<Utc>,
    ) -> Result<DriverAvailability, DriverAvailabilityRepositoryError>;

    /// Find a driver's row.
    async fn find(
        &self,
        driver_id: DriverId,
    ) -> Result<Option<DriverAvailability>, DriverAvailabilityRepositoryError>;

    /// Mark the driver unavailable regardless of heartbeat age.
    async fn set_unavailable(
        &self,
        driver_id: DriverId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError>;

    /// Mark the driver unavailable only while it is available and its last
    /// heartbeat is older than `heartbeat_before`.
    async fn expire_if_stale(
        &self,
        driver_id: DriverId,
        heartbeat_before: DateTime<Utc>,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError>;

    /// Available drivers whose heartbeat is older than `heartbeat_before`.
    async fn list_stale(
        &self,
        heartbeat_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DriverId>, DriverAvailabilityRepositoryError>;

    /// Record the order the driver is delivering.
    async fn attach_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError>;

    /// Clear the current order, only while it still references `order_id`.
    async fn detach_order(
        &self,
        driver_id: DriverId,
        order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError>;
}

/// Fixture implementation for tests that do not exercise availability.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDriverAvailabilityRepository;

#[async_trait]
impl DriverAvailabilityRepository for FixtureDriverAvailabilityRepository {
    async fn record_heartbeat(
        &self,
        driver_id: DriverId,
        at: DateTime<Utc>,
    ) -> Result<DriverAvailability, DriverAvailabilityRepositoryError> {
        Ok(DriverAvailability::first_heartbeat(driver_id, at))
    }

    async fn find(
        &self,
        _driver_id: DriverId,
    ) -> Result<Option<DriverAvailability>, DriverAvailabilityRepositoryError> {
        Ok(None)
    }

    async fn set_unavailable(
        &self,
        _driver_id: DriverId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }

    async fn expire_if_stale(
        &self,
        _driver_id: DriverId,
        _heartbeat_before: DateTime<Utc>,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }

    async fn list_stale(
        &self,
        _heartbeat_before: DateTime<Utc>,
        _limit: i64,
    ) -> Result<Vec<DriverId>, DriverAvailabilityRepositoryError> {
        Ok(Vec::new())
    }

    async fn attach_order(
        &self,
        _driver_id: DriverId,
        _order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }

    async fn detach_order(
        &self,
        _driver_id: DriverId,
        _order_id: OrderId,
    ) -> Result<ConditionalWrite<DriverAvailability>, DriverAvailabilityRepositoryError> {
        Ok(ConditionalWrite::Missing)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_heartbeat_echoes_an_available_row() {
        let repo = FixtureDriverAvailabilityRepository;
        let driver = DriverId::new(3).expect("driver id");
        let now = Utc::now();
        let row = repo
            .record_heartbeat(driver, now)
            .await
            .expect("fixture heartbeat succeeds");
        assert!(row.is_available);
        assert_eq!(row.last_heartbeat_at, now);
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_find_returns_none() {
        let repo = FixtureDriverAvailabilityRepository;
        let found = repo
            .find(DriverId::new(3).expect("driver id"))
            .await
            .expect("fixture lookup succeeds");
        assert!(found.is_none());
    }

    #[rstest]
    fn query_error_formats_message() {
        let err = DriverAvailabilityRepositoryError::query("broken sql");
        assert!(err.to_string().contains("broken sql"));
    }
}
