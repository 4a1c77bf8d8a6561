//! Driving port for merging one device batch into storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DeviceId, DocumentKind, DocumentSubmission, Error, SyncContext};

/// Identity and optional position a device reports with its batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceReport {
    /// External identifier as sent; validated by the coordinator.
    pub device_id: String,
    /// Suggested display name.
    pub name: Option<String>,
    /// Latitude of the current fix.
    pub latitude: Option<f64>,
    /// Longitude of the current fix.
    pub longitude: Option<f64>,
    /// Capture time of the fix, when the device supplied a usable one.
    pub reported_at: Option<DateTime<Utc>>,
}

/// One upload from a device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncBatch {
    /// Device identity and position.
    pub device: DeviceReport,
    /// Sale documents in submission order.
    pub sales: Vec<DocumentSubmission>,
    /// Order documents in submission order.
    pub orders: Vec<DocumentSubmission>,
}

/// Request accepted by [`DeviceSyncCommand::sync`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSyncRequest {
    /// Caller identity.
    pub context: SyncContext,
    /// Uploaded batch.
    pub batch: SyncBatch,
}

/// Counters for one document family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyStats {
    /// Headers inserted or overwritten.
    pub headers_touched: u64,
    /// Headers inserted for the first time.
    pub headers_created: u64,
    /// Lines written across all touched documents.
    pub lines_inserted: u64,
    /// Documents skipped as malformed.
    pub skipped: u64,
}

/// Aggregate counters for a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Sale family counters.
    pub sales: FamilyStats,
    /// Order family counters.
    pub orders: FamilyStats,
    /// Whether a location sample was appended.
    pub location_recorded: bool,
    /// Whether this batch registered the device.
    pub device_created: bool,
}

impl SyncStats {
    /// Counters of one family.
    #[must_use]
    pub const fn family(&self, kind: DocumentKind) -> &FamilyStats {
        match kind {
            DocumentKind::Sale => &self.sales,
            DocumentKind::Order => &self.orders,
        }
    }

    /// Mutable counters of one family.
    pub fn family_mut(&mut self, kind: DocumentKind) -> &mut FamilyStats {
        match kind {
            DocumentKind::Sale => &mut self.sales,
            DocumentKind::Order => &mut self.orders,
        }
    }
}

/// Result of a committed batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSyncOutcome {
    /// Normalised device identifier.
    pub device_id: DeviceId,
    /// Counters.
    pub stats: SyncStats,
}

/// Use-case port for device batch ingestion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceSyncCommand: Send + Sync {
    /// Merge `request.batch` atomically.
    ///
    /// Fails with `invalid_request` before touching storage when the batch is
    /// structurally unusable, `conflict` when the device belongs to another
    /// account, and `service_unavailable` when storage fails. Failures leave
    /// no writes behind.
    async fn sync(&self, request: DeviceSyncRequest) -> Result<DeviceSyncOutcome, Error>;
}
