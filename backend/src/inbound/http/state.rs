//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    DriverAvailabilityCommand, FixtureDriverAvailabilityCommand, FixtureOrderAssignment,
    FixtureOrderLifecycle, OrderAssignment, OrderLifecycle,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub lifecycle: Arc<dyn OrderLifecycle>,
    pub assignment: Arc<dyn OrderAssignment>,
    pub availability: Arc<dyn DriverAvailabilityCommand>,
}

impl HttpState {
    /// Construct state from port implementations.
    pub fn new(
        lifecycle: Arc<dyn OrderLifecycle>,
        assignment: Arc<dyn OrderAssignment>,
        availability: Arc<dyn DriverAvailabilityCommand>,
    ) -> Self {
        Self {
            lifecycle,
            assignment,
            availability,
        }
    }

    /// Replace the lifecycle port.
    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn OrderLifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Replace the assignment port.
    pub fn with_assignment(mut self, assignment: Arc<dyn OrderAssignment>) -> Self {
        self.assignment = assignment;
        self
    }

    /// Replace the availability port.
    pub fn with_availability(mut self, availability: Arc<dyn DriverAvailabilityCommand>) -> Self {
        self.availability = availability;
        self
    }
}

impl Default for HttpState {
    /// State backed by fixture ports: lookups report not found.
    fn default() -> Self {
        Self::new(
            Arc::new(FixtureOrderLifecycle),
            Arc::new(FixtureOrderAssignment),
            Arc::new(FixtureDriverAvailabilityCommand),
        )
    }
}
