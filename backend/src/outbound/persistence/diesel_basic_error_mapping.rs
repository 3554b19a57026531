//! Diesel and pool error mapping shared by the order and availability
//! adapters.
//!
//! Both ports expose the same `Connection`/`Query` split, so the helpers take
//! the port's constructors as closures.

use tracing::debug;

use super::pool::PoolError;

/// Map a pool failure onto the port's connection constructor.
pub(crate) fn map_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map a Diesel failure onto the port's query or connection constructor.
///
/// Closed connections and failures to send a command count as connection
/// errors; everything else, constraint violations included, is a query error.
pub(crate) fn map_diesel_error<E, Q, C>(error: diesel::result::Error, query: Q, connection: C) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
{
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand,
            _,
        ) => connection("database connection error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            query(format!("constraint rejected write: {}", info.message()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            query("transaction serialisation failure".to_owned())
        }
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::DeserializationError(err) => query(format!("row decoding failed: {err}")),
        _ => query("database error".to_owned()),
    }
}
