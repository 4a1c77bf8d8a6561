//! Prometheus adapter for device sync metrics.
//!
//! Counters are registered with a provided registry and exposed through the
//! `/metrics` endpoint alongside the HTTP middleware metrics.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::DocumentKind;
use crate::domain::ports::{BatchOutcome, DocumentCounts, SyncMetrics, SyncMetricsError};

/// Prometheus-backed sync metrics recorder.
///
/// # Metrics
///
/// - `device_sync_batches_total{outcome}`: `committed`, `invalid`,
///   `conflict` or `failed`.
/// - `device_sync_documents_total{family,result}`: family `sales` or
///   `orders`; result `created`, `updated` or `skipped`.
pub struct PrometheusSyncMetrics {
    batches_total: IntCounterVec,
    documents_total: IntCounterVec,
}

impl PrometheusSyncMetrics {
    /// Create and register metrics with the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be registered (e.g., if a metric
    /// with the same name already exists in the registry).
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let batches_total = IntCounterVec::new(
            Opts::new("device_sync_batches_total", "Device sync batches by outcome"),
            &["outcome"],
        )?;
        let documents_total = IntCounterVec::new(
            Opts::new(
                "device_sync_documents_total",
                "Documents in committed device sync batches",
            ),
            &["family", "result"],
        )?;
        registry.register(Box::new(batches_total.clone()))?;
        registry.register(Box::new(documents_total.clone()))?;
        Ok(Self {
            batches_total,
            documents_total,
        })
    }

    fn add_documents(&self, kind: DocumentKind, result: &str, count: u64) {
        if count > 0 {
            self.documents_total
                .with_label_values(&[kind.family(), result])
                .inc_by(count);
        }
    }
}

#[async_trait]
impl SyncMetrics for PrometheusSyncMetrics {
    async fn record_batch(&self, outcome: BatchOutcome) -> Result<(), SyncMetricsError> {
        self.batches_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        Ok(())
    }

    async fn record_documents(
        &self,
        kind: DocumentKind,
        counts: DocumentCounts,
    ) -> Result<(), SyncMetricsError> {
        self.add_documents(kind, "created", counts.created);
        self.add_documents(kind, "updated", counts.updated);
        self.add_documents(kind, "skipped", counts.skipped);
        Ok(())
    }
}
