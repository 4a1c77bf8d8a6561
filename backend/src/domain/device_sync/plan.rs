//! Pure validation of an incoming batch.
//!
//! Nothing here touches storage. A batch that fails these checks is
//! rejected before a transaction is opened; a malformed document is dropped
//! from the plan and counted.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::warn;

use super::SyncPolicy;
use crate::domain::ports::{DeviceReport, DeviceSyncRequest, SyncStats};
use crate::domain::{
    AccountLogin, Coordinates, DeviceId, DocumentKind, DocumentSubmission, Error, LocationSample,
    SyncContext, SyncDocument,
};

/// Device fields needed by the registry.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct DeviceIdentity {
    pub id: DeviceId,
    pub suggested_name: Option<String>,
}

/// Everything the transactional phase needs, already validated.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct BatchPlan {
    pub device: DeviceIdentity,
    pub context: SyncContext,
    pub fallback_login: AccountLogin,
    pub received_at: DateTime<Utc>,
    pub location: Option<LocationSample>,
    pub documents: Vec<(DocumentKind, SyncDocument)>,
    /// Counters pre-seeded with skipped documents.
    pub stats: SyncStats,
}

pub(super) fn plan_batch(
    request: DeviceSyncRequest,
    policy: &SyncPolicy,
    received_at: DateTime<Utc>,
) -> Result<BatchPlan, Error> {
    let DeviceSyncRequest { context, batch } = request;
    let device_id = DeviceId::new(&batch.device.device_id).map_err(|_| {
        Error::invalid_request("device.device_id is required").with_details(json!({
            "field": "device.device_id",
            "code": "missing_device_id",
        }))
    })?;

    let submitted = batch.sales.len().saturating_add(batch.orders.len());
    if let Some(limit) = policy
        .max_documents_per_batch()
        .filter(|limit| submitted > *limit)
    {
        return Err(
            Error::invalid_request("batch carries too many documents").with_details(json!({
                "code": "too_many_documents",
                "limit": limit,
                "submitted": submitted,
            })),
        );
    }

    let location = location_sample(&device_id, &batch.device, received_at);
    let mut stats = SyncStats::default();
    let mut documents = Vec::with_capacity(submitted);
    let families = [
        (DocumentKind::Sale, batch.sales),
        (DocumentKind::Order, batch.orders),
    ];
    for (kind, submissions) in families {
        for (index, submission) in submissions.into_iter().enumerate() {
            match prepare_document(submission, policy) {
                Ok(document) => documents.push((kind, document)),
                Err(reason) => {
                    warn!(
                        device_id = %device_id,
                        family = kind.family(),
                        index,
                        reason,
                        "skipping malformed document"
                    );
                    stats.family_mut(kind).skipped += 1;
                }
            }
        }
    }

    Ok(BatchPlan {
        device: DeviceIdentity {
            id: device_id,
            suggested_name: batch.device.name,
        },
        context,
        fallback_login: policy.fallback_login().clone(),
        received_at,
        location,
        documents,
        stats,
    })
}

fn prepare_document(
    submission: DocumentSubmission,
    policy: &SyncPolicy,
) -> Result<SyncDocument, &'static str> {
    let line_count = submission.lines.len();
    if policy
        .max_lines_per_document()
        .is_some_and(|limit| line_count > limit)
    {
        return Err("too many lines");
    }
    submission
        .into_document(policy.coordinate_defaults())
        .map_err(|_| "missing document number")
}

fn location_sample(
    device_id: &DeviceId,
    report: &DeviceReport,
    received_at: DateTime<Utc>,
) -> Option<LocationSample> {
    let (Some(latitude), Some(longitude)) = (report.latitude, report.longitude) else {
        return None;
    };
    match Coordinates::new(latitude, longitude) {
        Ok(coordinates) => Some(LocationSample {
            device_id: device_id.clone(),
            coordinates,
            captured_at: report.reported_at.unwrap_or(received_at),
        }),
        Err(error) => {
            warn!(device_id = %device_id, %error, "ignoring unusable location fix");
            None
        }
    }
}
