//! Domain primitives, services, and ports.
//!
//! Purpose: define the order lifecycle core. Entities are plain data, every
//! mutation is a guarded write request, and services own the rules that decide
//! which requests are issued.
//!
//! Public surface:
//! - Error, ErrorCode: transport-agnostic failure payload.
//! - Order, OrderStatus, StatusHistoryEntry: the order aggregate.
//! - DriverAvailability: per-driver availability row.
//! - OrderLifecycleService, AssignmentService, AvailabilityService: driving
//!   port implementations.
//! - MaintenanceService, MaintenanceScheduler: time-driven sweeps.

pub mod assignment_service;
pub mod availability;
pub mod availability_service;
pub mod error;
pub mod identifiers;
pub mod maintenance;
pub mod order;
pub mod order_lifecycle_service;
pub mod ports;
mod store_errors;

pub use self::assignment_service::AssignmentService;
pub use self::availability::DriverAvailability;
pub use self::availability_service::AvailabilityService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identifiers::{
    Actor, DriverId, IdentifierValidationError, OrderId, RestaurantId, UserId,
};
pub use self::maintenance::{
    MaintenanceConfig, MaintenanceConfigError, MaintenanceScheduler, MaintenanceService,
    RowError, SchedulerHandle, SweepJob, SweepReport, UnknownSweepJob,
};
pub use self::order::{
    ALL_STATUSES, DriverClaim, DriverReassignment, NewOrder, NewOrderValidationError,
    NewStatusHistoryEntry, Order, OrderLineItem, OrderStatus, OrderTimestamps, OrderTotals,
    ParseOrderStatusError, StatusChange, StatusHistoryEntry, TimestampField,
};
pub use self::order_lifecycle_service::{OrderLifecycleService, TransitionGuard};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use delivery_backend::domain::{ApiResult, Error};
///
/// fn claim() -> ApiResult<()> {
///     Err(Error::conflict("order already claimed"))
/// }
/// assert!(claim().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
