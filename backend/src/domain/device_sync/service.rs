//! Domain service implementing the device sync driving port.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt as _;
use mockable::Clock;
use serde_json::json;
use tracing::{error, info, warn};

use super::SyncPolicy;
use super::apply::apply_batch;
use super::plan::plan_batch;
use crate::domain::ports::{
    BatchOutcome, DeviceSyncCommand, DeviceSyncOutcome, DeviceSyncRequest, DocumentCounts,
    NoOpSyncMetrics, SyncAbort, SyncMetrics, SyncStats, SyncStore, SyncStoreError, unit_of_work,
};
use crate::domain::{DocumentKind, Error, ErrorCode};

/// Sync coordinator backed by a transactional store.
#[derive(Clone)]
pub struct DeviceSyncService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    policy: SyncPolicy,
    metrics: Arc<dyn SyncMetrics>,
}

impl<S> DeviceSyncService<S> {
    /// Create a coordinator with metrics disabled.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, policy: SyncPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
            metrics: Arc::new(NoOpSyncMetrics),
        }
    }

    /// Record outcomes through `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn SyncMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    async fn record_batch(&self, outcome: BatchOutcome) {
        if let Err(error) = self.metrics.record_batch(outcome).await {
            warn!(%error, outcome = outcome.as_str(), "failed to record sync batch metric");
        }
    }

    async fn record_documents(&self, stats: &SyncStats) {
        for kind in DocumentKind::ALL {
            let family = stats.family(kind);
            let counts = DocumentCounts {
                created: family.headers_created,
                updated: family.headers_touched.saturating_sub(family.headers_created),
                skipped: family.skipped,
            };
            if let Err(error) = self.metrics.record_documents(kind, counts).await {
                warn!(%error, family = kind.family(), "failed to record sync document metric");
            }
        }
    }
}

fn map_store_error(error: &SyncStoreError) -> Error {
    error!(%error, "device sync rolled back after storage failure");
    let message = match error {
        SyncStoreError::Connection { .. } => "sync storage is unavailable",
        SyncStoreError::Query { .. } => "sync storage rejected the batch",
        SyncStoreError::Conflict { .. } => "sync storage detected a concurrent write",
    };
    Error::service_unavailable(message).with_details(json!({ "retryable": true }))
}

fn outcome_for(error: &Error) -> BatchOutcome {
    match error.code() {
        ErrorCode::Conflict => BatchOutcome::Conflict,
        ErrorCode::InvalidRequest => BatchOutcome::Invalid,
        _ => BatchOutcome::Failed,
    }
}

#[async_trait]
impl<S> DeviceSyncCommand for DeviceSyncService<S>
where
    S: SyncStore,
{
    async fn sync(&self, request: DeviceSyncRequest) -> Result<DeviceSyncOutcome, Error> {
        let received_at = self.clock.utc();
        let plan = match plan_batch(request, &self.policy, received_at) {
            Ok(plan) => plan,
            Err(error) => {
                self.record_batch(BatchOutcome::Invalid).await;
                return Err(error);
            }
        };
        let device_id = plan.device.id.clone();

        let work = unit_of_work(move |tx| apply_batch(tx, plan).boxed());
        let result = self
            .store
            .run_in_transaction(work)
            .await
            .map_err(|abort| match abort {
                SyncAbort::Rejected(error) => error,
                SyncAbort::Store(error) => map_store_error(&error),
            });

        match result {
            Ok(stats) => {
                info!(
                    device_id = %device_id,
                    device_created = stats.device_created,
                    location_recorded = stats.location_recorded,
                    sales_headers = stats.sales.headers_touched,
                    sales_lines = stats.sales.lines_inserted,
                    sales_skipped = stats.sales.skipped,
                    orders_headers = stats.orders.headers_touched,
                    orders_lines = stats.orders.lines_inserted,
                    orders_skipped = stats.orders.skipped,
                    "device sync committed"
                );
                self.record_batch(BatchOutcome::Committed).await;
                self.record_documents(&stats).await;
                Ok(DeviceSyncOutcome { device_id, stats })
            }
            Err(error) => {
                self.record_batch(outcome_for(&error)).await;
                Err(error)
            }
        }
    }
}
