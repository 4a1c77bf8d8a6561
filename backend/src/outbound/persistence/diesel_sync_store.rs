//! PostgreSQL-backed sync store.
//!
//! One batch maps to one database transaction on a pooled connection. The
//! device row is locked with `SELECT .. FOR UPDATE` so concurrent batches
//! from the same device serialise on it; header upserts lock their own rows
//! through `ON CONFLICT DO UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::OptionalExtension;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    DeviceClaim, HeaderUpsert, HeaderWrite, LineGeneration, SyncAbort, SyncStore, SyncStoreError,
    SyncTransaction, SyncWork,
};
use crate::domain::{
    AccountId, AccountLogin, Device, DeviceId, DocumentHeader, DocumentKind, DocumentLine,
    DocumentNumber, LocationSample, NewDevice,
};

use super::diesel_helpers::{diesel_error_for, map_diesel_error, map_pool_error};
use super::document_tables::{order_tables, sale_tables};
use super::models::{DeviceRow, NewAccountRow, NewDeviceRow, NewLocationRow};
use super::pool::DbPool;
use super::schema::{accounts, devices, location_samples};

/// Diesel-backed implementation of the sync store port.
#[derive(Clone)]
pub struct DieselSyncStore {
    pool: DbPool,
}

impl DieselSyncStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Error type threaded through `AsyncConnection::transaction`, which needs
/// `From<diesel::result::Error>`.
enum TxError {
    Abort(SyncAbort),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl TxError {
    fn into_abort(self) -> SyncAbort {
        match self {
            Self::Abort(abort) => abort,
            Self::Diesel(error) => map_diesel_error(error, "finish sync transaction").into(),
        }
    }
}

type ClaimedRow = (String, String, Uuid, DateTime<Utc>, bool);

struct DieselSyncTransaction<'c> {
    conn: &'c mut AsyncPgConnection,
}

fn invalid_stored_device(error: impl std::fmt::Display) -> SyncStoreError {
    SyncStoreError::query(format!("stored device row is invalid: {error}"))
}

impl DieselSyncTransaction<'_> {
    async fn load_device(&mut self, id: &DeviceId) -> Result<Option<Device>, SyncStoreError> {
        let row = devices::table
            .find(id.as_str())
            .select(DeviceRow::as_select())
            .for_update()
            .first(self.conn)
            .await
            .optional()
            .map_err(diesel_error_for("find device"))?;
        row.map(Device::try_from)
            .transpose()
            .map_err(invalid_stored_device)
    }
}

#[async_trait]
impl SyncTransaction for DieselSyncTransaction<'_> {
    async fn find_device(&mut self, id: &DeviceId) -> Result<Option<Device>, SyncStoreError> {
        self.load_device(id).await
    }

    async fn ensure_account(&mut self, login: &AccountLogin) -> Result<AccountId, SyncStoreError> {
        let row = NewAccountRow {
            id: Uuid::new_v4(),
            login: login.as_str(),
        };
        // The no-op update makes RETURNING yield the existing id on conflict.
        let id: Uuid = diesel::insert_into(accounts::table)
            .values(&row)
            .on_conflict(accounts::login)
            .do_update()
            .set(accounts::login.eq(excluded(accounts::login)))
            .returning(accounts::id)
            .get_result(self.conn)
            .await
            .map_err(diesel_error_for("ensure fallback account"))?;
        Ok(AccountId::from_uuid(id))
    }

    async fn claim_device(&mut self, device: &NewDevice) -> Result<DeviceClaim, SyncStoreError> {
        // `xmax = 0` holds only for a row this statement inserted; a lost
        // race returns the winner's row with its owner untouched.
        let (device_id, name, account_id, last_contact_at, created): ClaimedRow =
            diesel::insert_into(devices::table)
                .values(&NewDeviceRow::from(device))
                .on_conflict(devices::device_id)
                .do_update()
                .set(devices::device_id.eq(excluded(devices::device_id)))
                .returning((
                    devices::device_id,
                    devices::name,
                    devices::account_id,
                    devices::last_contact_at,
                    sql::<Bool>("(xmax = 0)"),
                ))
                .get_result(self.conn)
                .await
                .map_err(diesel_error_for("claim device"))?;
        let stored = Device::try_from(DeviceRow {
            device_id,
            name,
            account_id,
            last_contact_at,
        })
        .map_err(invalid_stored_device)?;
        Ok(DeviceClaim {
            device: stored,
            created,
        })
    }

    async fn touch_device(
        &mut self,
        id: &DeviceId,
        contact_at: DateTime<Utc>,
        rename: Option<String>,
    ) -> Result<(), SyncStoreError> {
        let target = devices::table.find(id.as_str());
        let updated = match rename {
            Some(name) => {
                diesel::update(target)
                    .set((
                        devices::last_contact_at.eq(contact_at),
                        devices::name.eq(name),
                    ))
                    .execute(self.conn)
                    .await
            }
            None => {
                diesel::update(target)
                    .set(devices::last_contact_at.eq(contact_at))
                    .execute(self.conn)
                    .await
            }
        }
        .map_err(diesel_error_for("touch device"))?;
        if updated == 0 {
            return Err(SyncStoreError::query(format!("device {id} vanished")));
        }
        Ok(())
    }

    async fn append_location(&mut self, sample: &LocationSample) -> Result<(), SyncStoreError> {
        diesel::insert_into(location_samples::table)
            .values(&NewLocationRow::from(sample))
            .execute(self.conn)
            .await
            .map_err(diesel_error_for("append location"))?;
        Ok(())
    }

    async fn upsert_header(
        &mut self,
        kind: DocumentKind,
        header: &DocumentHeader,
        device: &Device,
    ) -> Result<HeaderUpsert, SyncStoreError> {
        let generation = match kind {
            DocumentKind::Sale => sale_tables::upsert_header(self.conn, header, device).await,
            DocumentKind::Order => order_tables::upsert_header(self.conn, header, device).await,
        }
        .map_err(diesel_error_for("upsert header"))?;
        let generation = LineGeneration::new(generation);
        // Updates always bump the generation, so only inserts stay at 1.
        let write = if generation == LineGeneration::FIRST {
            HeaderWrite::Created
        } else {
            HeaderWrite::Updated
        };
        Ok(HeaderUpsert { write, generation })
    }

    async fn replace_lines(
        &mut self,
        kind: DocumentKind,
        number: &DocumentNumber,
        generation: LineGeneration,
        lines: &[DocumentLine],
    ) -> Result<u64, SyncStoreError> {
        match kind {
            DocumentKind::Sale => {
                sale_tables::replace_lines(self.conn, number, generation.get(), lines).await
            }
            DocumentKind::Order => {
                order_tables::replace_lines(self.conn, number, generation.get(), lines).await
            }
        }
        .map_err(diesel_error_for("replace lines"))
    }
}

#[async_trait]
impl SyncStore for DieselSyncStore {
    async fn run_in_transaction<T>(&self, work: SyncWork<T>) -> Result<T, SyncAbort>
    where
        T: Send + 'static,
    {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        conn.transaction(|conn| {
            async move {
                let mut tx = DieselSyncTransaction { conn };
                work(&mut tx as &mut dyn SyncTransaction)
                    .await
                    .map_err(TxError::Abort)
            }
            .scope_boxed()
        })
        .await
        .map_err(TxError::into_abort)
    }
}
