//! Builders that turn a pair of repositories into the running services.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{DriverAvailabilityRepository, OrderRepository};
use crate::domain::{
    AssignmentService, AvailabilityService, MaintenanceConfig, MaintenanceService,
    OrderLifecycleService,
};
use crate::inbound::http::state::HttpState;

/// Everything the server needs from one storage backend.
pub struct ServiceBundle<O, A> {
    /// Driving ports for the HTTP handlers.
    pub http_state: HttpState,
    /// Sweep runner shared with the scheduler.
    pub maintenance: Arc<MaintenanceService<O, A>>,
}

/// Wire the lifecycle, assignment, availability, and maintenance services
/// over the same repositories and clock.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use delivery_backend::domain::MaintenanceConfig;
/// use delivery_backend::outbound::memory::{
///     InMemoryDriverAvailabilityRepository, InMemoryOrderRepository,
/// };
/// use delivery_backend::server::build_services;
///
/// let bundle = build_services(
///     Arc::new(InMemoryOrderRepository::new()),
///     Arc::new(InMemoryDriverAvailabilityRepository::new()),
///     Arc::new(mockable::DefaultClock),
///     MaintenanceConfig::default(),
/// );
/// assert_eq!(bundle.maintenance.config().batch_size, 500);
/// ```
pub fn build_services<O, A>(
    orders: Arc<O>,
    availability: Arc<A>,
    clock: Arc<dyn Clock>,
    config: MaintenanceConfig,
) -> ServiceBundle<O, A>
where
    O: OrderRepository + 'static,
    A: DriverAvailabilityRepository + 'static,
{
    let lifecycle = OrderLifecycleService::new(
        Arc::clone(&orders),
        Arc::clone(&availability),
        Arc::clone(&clock),
    );
    let assignment = AssignmentService::new(
        Arc::clone(&orders),
        Arc::clone(&availability),
        Arc::clone(&clock),
    );
    let availability_service =
        AvailabilityService::new(Arc::clone(&availability), Arc::clone(&clock));

    let maintenance = MaintenanceService::new(
        OrderLifecycleService::new(orders, Arc::clone(&availability), Arc::clone(&clock)),
        AvailabilityService::new(availability, Arc::clone(&clock)),
        clock,
        config,
    );

    ServiceBundle {
        http_state: HttpState::new(
            Arc::new(lifecycle),
            Arc::new(assignment),
            Arc::new(availability_service),
        ),
        maintenance: Arc::new(maintenance),
    }
}
