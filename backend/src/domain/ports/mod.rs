//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) are implemented by outbound adapters; driving
//! ports are implemented by the domain services and consumed by inbound
//! adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod conditional_write;
mod driver_availability_command;
mod driver_availability_repository;
mod order_assignment;
mod order_lifecycle;
mod order_repository;

pub use conditional_write::ConditionalWrite;
#[cfg(test)]
pub use driver_availability_command::MockDriverAvailabilityCommand;
pub use driver_availability_command::{
    DriverAvailabilityCommand, FixtureDriverAvailabilityCommand,
};
#[cfg(test)]
pub use driver_availability_repository::MockDriverAvailabilityRepository;
pub use driver_availability_repository::{
    DriverAvailabilityRepository, DriverAvailabilityRepositoryError,
    FixtureDriverAvailabilityRepository,
};
#[cfg(test)]
pub use order_assignment::MockOrderAssignment;
pub use order_assignment::{FixtureOrderAssignment, OrderAssignment};
#[cfg(test)]
pub use order_lifecycle::MockOrderLifecycle;
pub use order_lifecycle::{FixtureOrderLifecycle, OrderLifecycle, TransitionRequest};
#[cfg(test)]
pub use order_repository::MockOrderRepository;
pub use order_repository::{FixtureOrderRepository, OrderRepository, OrderRepositoryError};
