//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod device_sync_command;
mod sync_metrics;
mod sync_store;

#[cfg(test)]
pub use device_sync_command::MockDeviceSyncCommand;
pub use device_sync_command::{
    DeviceReport, DeviceSyncCommand, DeviceSyncOutcome, DeviceSyncRequest, FamilyStats,
    SyncBatch, SyncStats,
};
#[cfg(test)]
pub use sync_metrics::MockSyncMetrics;
pub use sync_metrics::{
    BatchOutcome, DocumentCounts, NoOpSyncMetrics, SyncMetrics, SyncMetricsError,
};
#[cfg(test)]
pub use sync_store::MockSyncTransaction;
pub use sync_store::{
    DeviceClaim, HeaderUpsert, HeaderWrite, LineGeneration, SyncAbort, SyncStore, SyncStoreError,
    SyncTransaction, SyncWork, unit_of_work,
};
