//! Domain primitives, ports and the device sync coordinator.
//!
//! Purpose: Define strongly typed values for devices, accounts and
//! commercial documents, the ports adapters implement, and the service that
//! merges a device batch into storage. Nothing here depends on Actix or
//! Diesel.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - DeviceSyncService: coordinator behind `ports::DeviceSyncCommand`.

pub mod account;
pub mod device;
pub mod device_sync;
pub mod documents;
pub mod error;
pub mod ports;
pub mod trace_id;

pub use self::account::{
    AccountId, AccountLogin, AccountValidationError, DEFAULT_FALLBACK_LOGIN, SyncContext,
};
pub use self::device::{
    Coordinates, Device, DeviceId, DeviceValidationError, LocationSample, NewDevice,
};
pub use self::device_sync::{
    DEFAULT_MAX_DOCUMENTS_PER_BATCH, DEFAULT_MAX_LINES_PER_DOCUMENT, DeviceSyncService,
    OWNER_CONFLICT_CODE, SyncPolicy,
};
pub use self::documents::{
    CoordinateDefaults, DocumentFlags, DocumentHeader, DocumentKind, DocumentLine, DocumentNumber,
    DocumentSubmission, DocumentTotals, DocumentValidationError, SyncDocument,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use fleet_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::conflict("device belongs to another account"))
/// }
/// # assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
