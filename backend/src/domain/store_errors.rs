//! Translation of driven-port failures into domain errors.
//!
//! Connection failures surface as `ServiceUnavailable`; anything else the
//! store reports is an internal error. Both are logged here with the
//! operation that hit them.

use tracing::error;

use crate::domain::Error;
use crate::domain::ports::{DriverAvailabilityRepositoryError, OrderRepositoryError};

pub(crate) fn map_order_error(operation: &'static str, err: OrderRepositoryError) -> Error {
    error!(operation, error = %err, "order store failure");
    match err {
        OrderRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("order store unavailable: {message}"))
        }
        OrderRepositoryError::Query { message } => {
            Error::internal(format!("order store error: {message}"))
        }
    }
}

pub(crate) fn map_availability_error(
    operation: &'static str,
    err: DriverAvailabilityRepositoryError,
) -> Error {
    error!(operation, error = %err, "availability store failure");
    match err {
        DriverAvailabilityRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("availability store unavailable: {message}"))
        }
        DriverAvailabilityRepositoryError::Query { message } => {
            Error::internal(format!("availability store error: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    #[case(OrderRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(OrderRepositoryError::query("syntax"), ErrorCode::InternalError)]
    fn order_errors_map_by_kind(#[case] err: OrderRepositoryError, #[case] code: ErrorCode) {
        assert_eq!(map_order_error("test", err).code(), code);
    }

    #[rstest]
    #[case(
        DriverAvailabilityRepositoryError::connection("refused"),
        ErrorCode::ServiceUnavailable
    )]
    #[case(DriverAvailabilityRepositoryError::query("syntax"), ErrorCode::InternalError)]
    fn availability_errors_map_by_kind(
        #[case] err: DriverAvailabilityRepositoryError,
        #[case] code: ErrorCode,
    ) {
        assert_eq!(map_availability_error("test", err).code(), code);
    }
}
