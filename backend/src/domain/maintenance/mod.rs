//! Time-driven maintenance sweeps.
//!
//! Each sweep selects a bounded batch of candidate rows and then issues one
//! guarded write per row through the same service entry points request
//! handlers use. The write restates the selection predicate, so a row a
//! concurrent actor already moved is skipped, and re-running a sweep finds
//! nothing it has already handled.

mod scheduler;
mod service;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Serialize;

use crate::domain::ErrorCode;

pub use scheduler::{MaintenanceScheduler, SchedulerHandle};
pub use service::MaintenanceService;

/// Reason recorded on orders cancelled by the unconfirmed-order sweep.
pub const VENDOR_TIMEOUT_REASON: &str = "vendor no-response timeout";

/// Individually named maintenance job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepJob {
    /// Cancel pending orders the vendor never confirmed.
    ExpireUnconfirmed,
    /// Soft-archive long-finished orders.
    ArchiveCompleted,
    /// Mark drivers with stale heartbeats unavailable.
    ExpireStaleAvailability,
}

impl SweepJob {
    /// Every job, in scheduling order.
    pub const ALL: [Self; 3] = [
        Self::ExpireUnconfirmed,
        Self::ArchiveCompleted,
        Self::ExpireStaleAvailability,
    ];

    /// Command and log name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ExpireUnconfirmed => "expire-unconfirmed",
            Self::ArchiveCompleted => "archive-completed",
            Self::ExpireStaleAvailability => "expire-stale-availability",
        }
    }
}

impl fmt::Display for SweepJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse error for [`SweepJob`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown maintenance job: {0}")]
pub struct UnknownSweepJob(pub String);

impl FromStr for SweepJob {
    type Err = UnknownSweepJob;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|job| job.name() == value)
            .ok_or_else(|| UnknownSweepJob(value.to_owned()))
    }
}

/// Thresholds and cadences for the sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Age after which a pending order is cancelled.
    pub unconfirmed_timeout: TimeDelta,
    /// Age after which a delivered or cancelled order is archived.
    pub archive_after: TimeDelta,
    /// Heartbeat age after which a driver is marked unavailable.
    pub availability_timeout: TimeDelta,
    /// Maximum rows a single sweep run selects.
    pub batch_size: i64,
    /// Cadence of [`SweepJob::ExpireUnconfirmed`].
    pub expire_unconfirmed_every: Duration,
    /// Cadence of [`SweepJob::ArchiveCompleted`].
    pub archive_completed_every: Duration,
    /// Cadence of [`SweepJob::ExpireStaleAvailability`].
    pub expire_availability_every: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            unconfirmed_timeout: TimeDelta::minutes(30),
            archive_after: TimeDelta::days(90),
            availability_timeout: TimeDelta::minutes(30),
            batch_size: 500,
            expire_unconfirmed_every: Duration::from_secs(60),
            archive_completed_every: Duration::from_secs(7 * 24 * 60 * 60),
            expire_availability_every: Duration::from_secs(5 * 60),
        }
    }
}

/// Rejected maintenance configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaintenanceConfigError {
    /// A threshold, cadence, or batch size was zero or negative.
    #[error("{field} must be positive")]
    NotPositive {
        /// Offending setting.
        field: &'static str,
    },
}

impl MaintenanceConfig {
    /// Check every threshold, cadence, and the batch size is positive.
    pub fn validate(self) -> Result<Self, MaintenanceConfigError> {
        let thresholds = [
            ("unconfirmed_timeout", self.unconfirmed_timeout),
            ("archive_after", self.archive_after),
            ("availability_timeout", self.availability_timeout),
        ];
        for (field, value) in thresholds {
            if value <= TimeDelta::zero() {
                return Err(MaintenanceConfigError::NotPositive { field });
            }
        }
        let cadences = [
            ("expire_unconfirmed_every", self.expire_unconfirmed_every),
            ("archive_completed_every", self.archive_completed_every),
            ("expire_availability_every", self.expire_availability_every),
        ];
        for (field, value) in cadences {
            if value.is_zero() {
                return Err(MaintenanceConfigError::NotPositive { field });
            }
        }
        if self.batch_size <= 0 {
            return Err(MaintenanceConfigError::NotPositive {
                field: "batch_size",
            });
        }
        Ok(self)
    }

    /// Timer period for `job`.
    pub fn cadence(&self, job: SweepJob) -> Duration {
        match job {
            SweepJob::ExpireUnconfirmed => self.expire_unconfirmed_every,
            SweepJob::ArchiveCompleted => self.archive_completed_every,
            SweepJob::ExpireStaleAvailability => self.expire_availability_every,
        }
    }
}

/// Failure on a single row of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// Row the failure belongs to, e.g. `order:12` or `driver:3`.
    pub subject: String,
    /// Error category.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Job that ran.
    pub job: SweepJob,
    /// Rows the run changed.
    pub affected: usize,
    /// Selected rows left alone because a concurrent actor got there first.
    pub skipped: usize,
    /// Rows whose write failed.
    pub errors: Vec<RowError>,
}

impl SweepReport {
    fn new(job: SweepJob) -> Self {
        Self {
            job,
            affected: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    /// Whether every selected row was either changed or skipped.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
