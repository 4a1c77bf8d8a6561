//! In-memory [`SyncStore`] with snapshot transactions.
//!
//! Each unit of work runs against a private copy of the committed state. The
//! copy replaces the committed state only when the work returns `Ok`, so
//! aborted batches leave nothing behind, just like a database rollback.
//! Transactions are not isolated from each other; tests drive them one at a
//! time.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    DeviceClaim, HeaderUpsert, HeaderWrite, LineGeneration, SyncAbort, SyncStore, SyncStoreError,
    SyncTransaction, SyncWork,
};
use crate::domain::{
    AccountId, AccountLogin, Device, DeviceId, DocumentHeader, DocumentKind, DocumentLine,
    DocumentNumber, LocationSample, NewDevice,
};

/// Stored header plus the server-assigned columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHeader {
    /// Header as last written.
    pub header: DocumentHeader,
    /// Owner copied from the device.
    pub account_id: AccountId,
    /// Device that last wrote the header.
    pub device_id: DeviceId,
    /// Current line generation.
    pub generation: LineGeneration,
}

/// Stored line row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLine {
    /// Generation the line belongs to.
    pub generation: LineGeneration,
    /// 1-based position within the document.
    pub line_number: u32,
    /// Line payload.
    pub line: DocumentLine,
}

type DocumentKey = (DocumentKind, DocumentNumber);

#[derive(Debug, Clone, Default)]
struct State {
    accounts: BTreeMap<String, AccountId>,
    devices: BTreeMap<DeviceId, Device>,
    locations: Vec<LocationSample>,
    headers: HashMap<DocumentKey, StoredHeader>,
    lines: HashMap<DocumentKey, Vec<StoredLine>>,
}

#[derive(Debug, Clone, Default)]
struct Faults {
    fail_header: Option<DocumentNumber>,
    fail_connection: bool,
}

/// In-memory transactional sync store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySyncStore {
    committed: Arc<Mutex<State>>,
    faults: Arc<Mutex<Faults>>,
    transactions: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

impl InMemorySyncStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return its identifier.
    pub fn seed_account(&self, login: &str) -> AccountId {
        let id = AccountId::random();
        lock(&self.committed).accounts.insert(login.to_owned(), id);
        id
    }

    /// Register a device owned by `owner`.
    pub fn seed_device(&self, id: &str, name: &str, owner: AccountId, at: DateTime<Utc>) {
        let Ok(device_id) = DeviceId::new(id) else {
            return;
        };
        let device = Device {
            id: device_id.clone(),
            name: name.to_owned(),
            owner,
            last_contact_at: at,
        };
        lock(&self.committed).devices.insert(device_id, device);
    }

    /// Make every header upsert for `number` fail with a query error.
    pub fn fail_on_header(&self, number: &str) {
        lock(&self.faults).fail_header = DocumentNumber::new(number).ok();
    }

    /// Make opening a transaction fail with a connection error.
    pub fn fail_connections(&self) {
        lock(&self.faults).fail_connection = true;
    }

    /// Number of transactions opened so far.
    #[must_use]
    pub fn transactions_opened(&self) -> u64 {
        *lock(&self.transactions)
    }

    /// Number of stored accounts.
    #[must_use]
    pub fn account_count(&self) -> usize {
        lock(&self.committed).accounts.len()
    }

    /// Account registered under `login`.
    #[must_use]
    pub fn account_by_login(&self, login: &str) -> Option<AccountId> {
        lock(&self.committed).accounts.get(login).copied()
    }

    /// Number of stored devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        lock(&self.committed).devices.len()
    }

    /// Stored device by identifier.
    #[must_use]
    pub fn device(&self, id: &str) -> Option<Device> {
        let device_id = DeviceId::new(id).ok()?;
        lock(&self.committed).devices.get(&device_id).cloned()
    }

    /// Location samples stored for `id`, oldest first.
    #[must_use]
    pub fn locations(&self, id: &str) -> Vec<LocationSample> {
        lock(&self.committed)
            .locations
            .iter()
            .filter(|sample| sample.device_id.as_str() == id)
            .cloned()
            .collect()
    }

    /// Number of stored headers of `kind`.
    #[must_use]
    pub fn header_count(&self, kind: DocumentKind) -> usize {
        lock(&self.committed)
            .headers
            .keys()
            .filter(|(stored_kind, _)| *stored_kind == kind)
            .count()
    }

    /// Stored header for `number`.
    #[must_use]
    pub fn header(&self, kind: DocumentKind, number: &str) -> Option<StoredHeader> {
        let number = DocumentNumber::new(number).ok()?;
        lock(&self.committed).headers.get(&(kind, number)).cloned()
    }

    /// Every stored line row for `number`, in line order.
    #[must_use]
    pub fn lines(&self, kind: DocumentKind, number: &str) -> Vec<StoredLine> {
        let Ok(number) = DocumentNumber::new(number) else {
            return Vec::new();
        };
        lock(&self.committed)
            .lines
            .get(&(kind, number))
            .cloned()
            .unwrap_or_default()
    }
}

struct InMemoryTransaction {
    state: State,
    faults: Faults,
}

#[async_trait]
impl SyncTransaction for InMemoryTransaction {
    async fn find_device(&mut self, id: &DeviceId) -> Result<Option<Device>, SyncStoreError> {
        Ok(self.state.devices.get(id).cloned())
    }

    async fn ensure_account(&mut self, login: &AccountLogin) -> Result<AccountId, SyncStoreError> {
        Ok(*self
            .state
            .accounts
            .entry(login.as_str().to_owned())
            .or_insert_with(AccountId::random))
    }

    async fn claim_device(&mut self, device: &NewDevice) -> Result<DeviceClaim, SyncStoreError> {
        if let Some(existing) = self.state.devices.get(&device.id) {
            return Ok(DeviceClaim {
                device: existing.clone(),
                created: false,
            });
        }
        let stored = Device {
            id: device.id.clone(),
            name: device.name.clone(),
            owner: device.owner,
            last_contact_at: device.contact_at,
        };
        self.state.devices.insert(device.id.clone(), stored.clone());
        Ok(DeviceClaim {
            device: stored,
            created: true,
        })
    }

    async fn touch_device(
        &mut self,
        id: &DeviceId,
        contact_at: DateTime<Utc>,
        rename: Option<String>,
    ) -> Result<(), SyncStoreError> {
        let device = self
            .state
            .devices
            .get_mut(id)
            .ok_or_else(|| SyncStoreError::query(format!("device {id} vanished")))?;
        device.last_contact_at = contact_at;
        if let Some(name) = rename {
            device.name = name;
        }
        Ok(())
    }

    async fn append_location(&mut self, sample: &LocationSample) -> Result<(), SyncStoreError> {
        self.state.locations.push(sample.clone());
        Ok(())
    }

    async fn upsert_header(
        &mut self,
        kind: DocumentKind,
        header: &DocumentHeader,
        device: &Device,
    ) -> Result<HeaderUpsert, SyncStoreError> {
        if self.faults.fail_header.as_ref() == Some(&header.number) {
            return Err(SyncStoreError::query(format!(
                "injected failure for {}",
                header.number
            )));
        }
        let key = (kind, header.number.clone());
        let (write, generation) = match self.state.headers.get(&key) {
            Some(existing) => (HeaderWrite::Updated, existing.generation.next()),
            None => (HeaderWrite::Created, LineGeneration::FIRST),
        };
        self.state.headers.insert(
            key,
            StoredHeader {
                header: header.clone(),
                account_id: device.owner,
                device_id: device.id.clone(),
                generation,
            },
        );
        Ok(HeaderUpsert { write, generation })
    }

    async fn replace_lines(
        &mut self,
        kind: DocumentKind,
        number: &DocumentNumber,
        generation: LineGeneration,
        lines: &[DocumentLine],
    ) -> Result<u64, SyncStoreError> {
        let fresh = (1_u32..)
            .zip(lines)
            .map(|(line_number, line)| StoredLine {
                generation,
                line_number,
                line: line.clone(),
            });
        let rows = self.state.lines.entry((kind, number.clone())).or_default();
        rows.extend(fresh);
        rows.retain(|row| row.generation == generation);
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl SyncStore for InMemorySyncStore {
    async fn run_in_transaction<T>(&self, work: SyncWork<T>) -> Result<T, SyncAbort>
    where
        T: Send + 'static,
    {
        let faults = lock(&self.faults).clone();
        if faults.fail_connection {
            return Err(SyncStoreError::connection("injected connection failure").into());
        }
        *lock(&self.transactions) += 1;

        let snapshot = lock(&self.committed).clone();
        let mut tx = InMemoryTransaction {
            state: snapshot,
            faults,
        };
        let value = work(&mut tx as &mut dyn SyncTransaction).await?;
        *lock(&self.committed) = tx.state;
        Ok(value)
    }
}
