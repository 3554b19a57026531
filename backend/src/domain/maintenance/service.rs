//! Sweep implementations.

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{error, info, warn};

use super::{MaintenanceConfig, RowError, SweepJob, SweepReport, VENDOR_TIMEOUT_REASON};
use crate::domain::ports::{DriverAvailabilityRepository, OrderRepository, TransitionRequest};
use crate::domain::{
    Actor, AvailabilityService, Error, ErrorCode, OrderLifecycleService, OrderStatus,
    TransitionGuard,
};

/// Runs the maintenance sweeps through the lifecycle and availability
/// services.
pub struct MaintenanceService<O, A> {
    lifecycle: OrderLifecycleService<O, A>,
    availability: AvailabilityService<A>,
    clock: Arc<dyn Clock>,
    config: MaintenanceConfig,
}

impl<O, A> MaintenanceService<O, A> {
    /// Create a new maintenance service.
    pub fn new(
        lifecycle: OrderLifecycleService<O, A>,
        availability: AvailabilityService<A>,
        clock: Arc<dyn Clock>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            lifecycle,
            availability,
            clock,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }
}

fn tally(report: &mut SweepReport, subject: impl Display, outcome: Result<bool, Error>) {
    match outcome {
        Ok(true) => report.affected += 1,
        Ok(false) => report.skipped += 1,
        Err(err) if err.is_expected_outcome() || err.code() == ErrorCode::NotFound => {
            report.skipped += 1;
        }
        Err(err) => report.errors.push(RowError {
            subject: subject.to_string(),
            code: err.code(),
            message: err.message().to_owned(),
        }),
    }
}

fn finish(report: SweepReport) -> SweepReport {
    info!(
        job = %report.job,
        rows_affected = report.affected,
        rows_skipped = report.skipped,
        row_errors = report.errors.len(),
        "maintenance sweep finished"
    );
    for row in &report.errors {
        warn!(job = %report.job, subject = %row.subject, code = ?row.code, error = %row.message, "maintenance sweep row failed");
    }
    report
}

fn selection_failed(job: SweepJob, err: Error) -> Error {
    error!(job = %job, error = %err, "maintenance sweep selection failed");
    err
}

impl<O, A> MaintenanceService<O, A>
where
    O: OrderRepository,
    A: DriverAvailabilityRepository,
{
    /// Run `job` against the current clock reading.
    pub async fn run(&self, job: SweepJob) -> Result<SweepReport, Error> {
        let now = self.clock.utc();
        match job {
            SweepJob::ExpireUnconfirmed => self.expire_unconfirmed(now).await,
            SweepJob::ArchiveCompleted => self.archive_completed(now).await,
            SweepJob::ExpireStaleAvailability => self.expire_stale_availability(now).await,
        }
    }

    /// Cancel pending orders placed more than the unconfirmed timeout before
    /// `now`.
    pub async fn expire_unconfirmed(&self, now: DateTime<Utc>) -> Result<SweepReport, Error> {
        let job = SweepJob::ExpireUnconfirmed;
        let cutoff = now - self.config.unconfirmed_timeout;
        let candidates = self
            .lifecycle
            .list_stale_pending(cutoff, self.config.batch_size)
            .await
            .map_err(|err| selection_failed(job, err))?;

        let mut report = SweepReport::new(job);
        for order_id in candidates {
            let request = TransitionRequest {
                order_id,
                target: OrderStatus::Cancelled,
                actor: Actor::System,
                reason: Some(VENDOR_TIMEOUT_REASON.to_owned()),
            };
            let guard = TransitionGuard {
                expected_current: OrderStatus::Pending,
                placed_before: Some(cutoff),
            };
            let outcome = self
                .lifecycle
                .apply_guarded_transition(request, guard, now)
                .await
                .map(|_| true);
            tally(&mut report, format_args!("order:{order_id}"), outcome);
        }
        Ok(finish(report))
    }

    /// Archive delivered and cancelled orders finished more than the archive
    /// threshold before `now`.
    pub async fn archive_completed(&self, now: DateTime<Utc>) -> Result<SweepReport, Error> {
        let job = SweepJob::ArchiveCompleted;
        let cutoff = now - self.config.archive_after;
        let candidates = self
            .lifecycle
            .list_archivable(cutoff, self.config.batch_size)
            .await
            .map_err(|err| selection_failed(job, err))?;

        let mut report = SweepReport::new(job);
        for order_id in candidates {
            let outcome = self
                .lifecycle
                .archive(order_id, cutoff, now)
                .await
                .map(|_| true);
            tally(&mut report, format_args!("order:{order_id}"), outcome);
        }
        Ok(finish(report))
    }

    /// Mark available drivers unavailable when their last heartbeat is older
    /// than the availability timeout.
    pub async fn expire_stale_availability(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, Error> {
        let job = SweepJob::ExpireStaleAvailability;
        let cutoff = now - self.config.availability_timeout;
        let candidates = self
            .availability
            .list_stale(cutoff, self.config.batch_size)
            .await
            .map_err(|err| selection_failed(job, err))?;

        let mut report = SweepReport::new(job);
        for driver_id in candidates {
            let outcome = self.availability.expire_if_stale(driver_id, cutoff).await;
            tally(&mut report, format_args!("driver:{driver_id}"), outcome);
        }
        Ok(finish(report))
    }
}
