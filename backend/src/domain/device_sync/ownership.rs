//! First-writer-wins ownership guard.

use serde_json::json;
use tracing::warn;

use crate::domain::{Device, Error, SyncContext};

/// `details.code` of the error returned when a device belongs to another
/// account.
pub const OWNER_CONFLICT_CODE: &str = "device_owner_conflict";

/// Reject a batch whose caller asserts an account other than the owner.
///
/// Anonymous callers never conflict; they sync under whatever account
/// already owns the device.
pub(super) fn ensure_owner(device: &Device, context: SyncContext) -> Result<(), Error> {
    match context.account() {
        Some(asserted) if asserted != device.owner => {
            warn!(
                device_id = %device.id,
                owner = %device.owner,
                asserted = %asserted,
                "device sync rejected: owner mismatch"
            );
            Err(
                Error::conflict("device is registered to a different account").with_details(
                    json!({
                        "code": OWNER_CONFLICT_CODE,
                        "deviceId": device.id.as_str(),
                    }),
                ),
            )
        }
        _ => Ok(()),
    }
}
