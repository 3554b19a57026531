//! Interval timers that drive the sweeps alongside request traffic.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::{MaintenanceService, SweepJob};
use crate::domain::ports::{DriverAvailabilityRepository, OrderRepository};

/// Spawns one timer task per [`SweepJob`].
pub struct MaintenanceScheduler<O, A> {
    service: Arc<MaintenanceService<O, A>>,
}

impl<O, A> MaintenanceScheduler<O, A>
where
    O: OrderRepository + 'static,
    A: DriverAvailabilityRepository + 'static,
{
    /// Create a scheduler for `service`.
    pub fn new(service: Arc<MaintenanceService<O, A>>) -> Self {
        Self { service }
    }

    /// Start the timers on the current Tokio runtime.
    ///
    /// Each job runs once immediately and then at its configured cadence. A
    /// failed run is logged by the service and retried on the next tick.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, signal) = watch::channel(false);
        let tasks = SweepJob::ALL
            .into_iter()
            .map(|job| {
                let service = Arc::clone(&self.service);
                let mut signal = signal.clone();
                tokio::spawn(async move {
                    let mut ticker = time::interval(service.config().cadence(job));
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {
                                if service.run(job).await.is_err() {
                                    debug!(job = %job, "sweep run failed; waiting for next tick");
                                }
                            }
                            changed = signal.changed() => {
                                if changed.is_err() || *signal.borrow() {
                                    break;
                                }
                            }
                        }
                    }
                    debug!(job = %job, "sweep timer stopped");
                })
            })
            .collect();
        info!("maintenance scheduler started");
        SchedulerHandle { shutdown, tasks }
    }
}

/// Running scheduler.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop every timer and wait for in-flight runs to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                debug!(error = %err, "sweep timer task ended abnormally");
            }
        }
        info!("maintenance scheduler stopped");
    }
}
