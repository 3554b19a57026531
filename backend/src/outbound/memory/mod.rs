//! In-process adapters implementing the store ports.
//!
//! Each port call takes the table lock once and evaluates its precondition
//! and mutation under it, giving every call the same all-or-nothing
//! behaviour a single conditional SQL statement has. Used by tests and by
//! the server's in-memory mode.

mod driver_availability_repository;
mod order_repository;

pub use driver_availability_repository::InMemoryDriverAvailabilityRepository;
pub use order_repository::InMemoryOrderRepository;
