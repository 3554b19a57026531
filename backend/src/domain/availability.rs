//! Driver availability records.
//!
//! One record per driver, created on the first heartbeat and never deleted.
//! Heartbeats are last-write-wins; the staleness sweep and the explicit
//! offline call both flip `is_available` to false.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DriverId, OrderId};

/// Availability state of a single driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAvailability {
    /// Driver the record belongs to.
    pub driver_id: DriverId,
    /// Whether the driver is accepting work.
    pub is_available: bool,
    /// Time of the most recent heartbeat.
    pub last_heartbeat_at: DateTime<Utc>,
    /// Order the driver is currently delivering, if any.
    pub current_order_id: Option<OrderId>,
}

impl DriverAvailability {
    /// Record produced by a driver's first heartbeat.
    pub fn first_heartbeat(driver_id: DriverId, at: DateTime<Utc>) -> Self {
        Self {
            driver_id,
            is_available: true,
            last_heartbeat_at: at,
            current_order_id: None,
        }
    }

    /// Apply a heartbeat in place.
    pub fn beat(&mut self, at: DateTime<Utc>) {
        self.is_available = true;
        self.last_heartbeat_at = at;
    }

    /// Whether the staleness sweep would flip this record at `heartbeat_before`.
    pub fn is_stale(&self, heartbeat_before: DateTime<Utc>) -> bool {
        self.is_available && self.last_heartbeat_at < heartbeat_before
    }
}
