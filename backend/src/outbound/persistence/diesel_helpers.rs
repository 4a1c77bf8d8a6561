//! Shared error mapping for Diesel adapters.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::SyncStoreError;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Extract a readable message from a Diesel error and emit debug context.
pub fn map_diesel_error_message(error: &DieselError, operation: &str) -> String {
    let error_message = error.to_string();
    debug!(%error_message, %operation, "diesel operation failed");
    error_message
}

/// Map pool errors to sync store connection errors.
pub fn map_pool_error(error: PoolError) -> SyncStoreError {
    SyncStoreError::connection(map_pool_error_message(error))
}

/// Map Diesel errors raised while running `operation`.
///
/// Uniqueness and serialisation failures surface as conflicts so callers
/// can tell a concurrent writer from a broken statement.
pub fn map_diesel_error(error: DieselError, operation: &str) -> SyncStoreError {
    let message = map_diesel_error_message(&error, operation);
    match error {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::SerializationFailure,
            _,
        ) => SyncStoreError::conflict(format!("{operation}: {message}")),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => {
            SyncStoreError::connection(format!("{operation}: {message}"))
        }
        _ => SyncStoreError::query(format!("{operation}: {message}")),
    }
}

/// Bind `operation` into a Diesel error mapper for `map_err`.
pub fn diesel_error_for(operation: &'static str) -> impl Fn(DieselError) -> SyncStoreError {
    move |error| map_diesel_error(error, operation)
}
