//! Resolve-or-create for devices inside the sync transaction.

use chrono::{DateTime, Utc};

use super::ownership::ensure_owner;
use super::plan::DeviceIdentity;
use crate::domain::ports::{SyncAbort, SyncTransaction};
use crate::domain::{AccountLogin, Device, NewDevice, SyncContext};

/// Device the batch will be written under.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ResolvedDevice {
    pub device: Device,
    pub created: bool,
}

/// Find the device or register it, then apply the ownership guard.
///
/// Unknown devices bind to the caller's account, or to the fallback service
/// account when the caller is anonymous. Known devices get their contact
/// time refreshed and, only after passing the guard, a changed name.
pub(super) async fn resolve_device(
    tx: &mut dyn SyncTransaction,
    identity: &DeviceIdentity,
    context: SyncContext,
    fallback_login: &AccountLogin,
    now: DateTime<Utc>,
) -> Result<ResolvedDevice, SyncAbort> {
    let (device, created) = match tx.find_device(&identity.id).await? {
        Some(device) => (device, false),
        None => {
            let owner = match context.account() {
                Some(account) => account,
                None => tx.ensure_account(fallback_login).await?,
            };
            let registration = NewDevice::new(
                identity.id.clone(),
                identity.suggested_name.as_deref(),
                owner,
                now,
            );
            let claim = tx.claim_device(&registration).await?;
            (claim.device, claim.created)
        }
    };

    ensure_owner(&device, context).map_err(SyncAbort::Rejected)?;

    if created {
        return Ok(ResolvedDevice { device, created });
    }

    let rename = device
        .renamed_to(identity.suggested_name.as_deref())
        .map(str::to_owned);
    tx.touch_device(&device.id, now, rename.clone()).await?;
    let device = Device {
        name: rename.unwrap_or(device.name),
        last_contact_at: now,
        ..device
    };
    Ok(ResolvedDevice {
        device,
        created: false,
    })
}
