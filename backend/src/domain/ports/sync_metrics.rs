//! Port for recording device sync outcomes.
//!
//! Implementations may export to Prometheus or discard everything. Recording
//! failures never fail a batch.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::DocumentKind;

define_port_error! {
    /// Errors exposed when recording sync metrics.
    pub enum SyncMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "sync metrics exporter failed: {message}",
    }
}

/// Terminal state of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The batch committed.
    Committed,
    /// Rejected before a transaction opened.
    Invalid,
    /// Rejected because the device belongs to another account.
    Conflict,
    /// Rolled back after a storage failure.
    Failed,
}

impl BatchOutcome {
    /// Stable label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Invalid => "invalid",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        }
    }
}

/// Per-family document counts of a committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentCounts {
    /// Headers inserted.
    pub created: u64,
    /// Headers overwritten.
    pub updated: u64,
    /// Documents skipped as malformed.
    pub skipped: u64,
}

/// Metrics recording port for sync batches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncMetrics: Send + Sync {
    /// Record the terminal state of a batch.
    async fn record_batch(&self, outcome: BatchOutcome) -> Result<(), SyncMetricsError>;

    /// Record document counts for one family of a committed batch.
    async fn record_documents(
        &self,
        kind: DocumentKind,
        counts: DocumentCounts,
    ) -> Result<(), SyncMetricsError>;
}

/// No-op implementation for when metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSyncMetrics;

#[async_trait]
impl SyncMetrics for NoOpSyncMetrics {
    async fn record_batch(&self, _outcome: BatchOutcome) -> Result<(), SyncMetricsError> {
        Ok(())
    }

    async fn record_documents(
        &self,
        _kind: DocumentKind,
        _counts: DocumentCounts,
    ) -> Result<(), SyncMetricsError> {
        Ok(())
    }
}
