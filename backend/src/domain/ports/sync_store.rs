//! Driven port for the transactional device sync store.
//!
//! A batch runs as one unit of work. The store opens a transaction, hands the
//! work a [`SyncTransaction`] handle and commits only when the work returns
//! `Ok`. Any `Err` rolls back every write made through the handle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;

use super::define_port_error;
use crate::domain::{
    AccountId, AccountLogin, Device, DeviceId, DocumentHeader, DocumentKind, DocumentLine,
    DocumentNumber, Error, LocationSample, NewDevice,
};

define_port_error! {
    /// Errors raised by sync store adapters.
    pub enum SyncStoreError {
        /// A connection could not be obtained or was lost.
        Connection { message: String } => "sync store connection failed: {message}",
        /// A statement failed during execution.
        Query { message: String } => "sync store query failed: {message}",
        /// A uniqueness constraint rejected the write.
        Conflict { message: String } => "sync store conflict: {message}",
    }
}

/// Why a unit of work ended without committing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncAbort {
    /// The store failed.
    #[error(transparent)]
    Store(#[from] SyncStoreError),
    /// The coordinator rejected the batch after opening the transaction.
    #[error("batch rejected: {0}")]
    Rejected(Error),
}

/// Result of registering a device seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceClaim {
    /// The stored device. When a concurrent sync won the insert this is
    /// that sync's row, owner included.
    pub device: Device,
    /// Whether this call inserted the row.
    pub created: bool,
}

/// Whether a header upsert inserted or overwrote the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderWrite {
    /// First write for this number.
    Created,
    /// Existing header overwritten in place.
    Updated,
}

/// Line generation a header currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineGeneration(i64);

impl LineGeneration {
    /// Generation assigned to a freshly inserted header.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw generation value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// The generation after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Outcome of [`SyncTransaction::upsert_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderUpsert {
    /// Insert or overwrite.
    pub write: HeaderWrite,
    /// Generation the replacement lines must be written under.
    pub generation: LineGeneration,
}

/// Operations available inside one sync transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncTransaction: Send {
    /// Look up a device by its external identifier.
    async fn find_device(&mut self, id: &DeviceId) -> Result<Option<Device>, SyncStoreError>;

    /// Resolve the account with `login`, creating it when absent.
    async fn ensure_account(&mut self, login: &AccountLogin) -> Result<AccountId, SyncStoreError>;

    /// Insert `device` unless a row with its identifier exists, returning
    /// the stored row either way.
    async fn claim_device(&mut self, device: &NewDevice) -> Result<DeviceClaim, SyncStoreError>;

    /// Record contact with a known device, renaming it when `rename` is set.
    async fn touch_device(
        &mut self,
        id: &DeviceId,
        contact_at: DateTime<Utc>,
        rename: Option<String>,
    ) -> Result<(), SyncStoreError>;

    /// Append one location sample.
    async fn append_location(&mut self, sample: &LocationSample) -> Result<(), SyncStoreError>;

    /// Insert or overwrite a header keyed by its number and bump its line
    /// generation.
    async fn upsert_header(
        &mut self,
        kind: DocumentKind,
        header: &DocumentHeader,
        device: &Device,
    ) -> Result<HeaderUpsert, SyncStoreError>;

    /// Make `lines` the complete line set of `number` under `generation`,
    /// discarding lines of every other generation. Returns lines written.
    async fn replace_lines(
        &mut self,
        kind: DocumentKind,
        number: &DocumentNumber,
        generation: LineGeneration,
        lines: &[DocumentLine],
    ) -> Result<u64, SyncStoreError>;
}

/// Work executed inside one transaction.
pub type SyncWork<T> = Box<
    dyn for<'t> FnOnce(&'t mut dyn SyncTransaction) -> BoxFuture<'t, Result<T, SyncAbort>> + Send,
>;

/// Box a closure as [`SyncWork`], pinning down its higher-ranked signature.
pub fn unit_of_work<T, F>(work: F) -> SyncWork<T>
where
    F: for<'t> FnOnce(&'t mut dyn SyncTransaction) -> BoxFuture<'t, Result<T, SyncAbort>>
        + Send
        + 'static,
{
    Box::new(work)
}

/// Port owning transaction boundaries for sync batches.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Run `work` in one transaction, committing only on `Ok`.
    async fn run_in_transaction<T>(&self, work: SyncWork<T>) -> Result<T, SyncAbort>
    where
        T: Send + 'static;
}
