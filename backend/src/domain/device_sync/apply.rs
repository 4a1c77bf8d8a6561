//! Transactional body of a batch.

use tracing::debug;

use super::plan::BatchPlan;
use super::registry::{ResolvedDevice, resolve_device};
use crate::domain::ports::{HeaderWrite, SyncAbort, SyncStats, SyncTransaction};

/// Apply a validated plan through `tx`.
///
/// Returns the batch counters. Any error leaves the caller to roll back;
/// nothing here tries to undo writes itself.
pub(super) async fn apply_batch(
    tx: &mut dyn SyncTransaction,
    plan: BatchPlan,
) -> Result<SyncStats, SyncAbort> {
    let BatchPlan {
        device: identity,
        context,
        fallback_login,
        received_at,
        location,
        documents,
        mut stats,
    } = plan;

    let ResolvedDevice { device, created } =
        resolve_device(tx, &identity, context, &fallback_login, received_at).await?;
    stats.device_created = created;

    if let Some(sample) = location {
        tx.append_location(&sample).await?;
        stats.location_recorded = true;
    }

    for (kind, document) in documents {
        let upsert = tx.upsert_header(kind, &document.header, &device).await?;
        let written = tx
            .replace_lines(kind, &document.header.number, upsert.generation, &document.lines)
            .await?;
        debug!(
            device_id = %device.id,
            family = kind.family(),
            number = %document.header.number,
            generation = upsert.generation.get(),
            lines = written,
            "document merged"
        );

        let family = stats.family_mut(kind);
        family.headers_touched += 1;
        if upsert.write == HeaderWrite::Created {
            family.headers_created += 1;
        }
        family.lines_inserted += written;
    }

    Ok(stats)
}
