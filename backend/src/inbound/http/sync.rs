//! Device sync HTTP handler.
//!
//! ```text
//! POST /api/v1/devices/sync
//! ```
//!
//! The handler is a thin shell: it decodes the lenient wire body, reads the
//! caller from the session cookie and hands both to the
//! [`DeviceSyncCommand`](crate::domain::ports::DeviceSyncCommand) port.

use actix_web::{post, web};

use crate::domain::ports::{DeviceSyncRequest, SyncBatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::json_error_handler;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::sync_dto::{SyncRequest, SyncResponse};

/// Default body limit for a sync push.
pub const DEFAULT_JSON_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// JSON extractor settings for the sync route.
///
/// Rejections come back in the shared error envelope rather than actix's
/// plain-text default.
pub fn sync_json_config(limit_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit_bytes)
        .error_handler(json_error_handler(limit_bytes))
}

/// Merge one device batch of sales and orders.
#[utoipa::path(
    post,
    path = "/api/v1/devices/sync",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Batch committed", body = SyncResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Device belongs to another account", body = ErrorSchema),
        (status = 503, description = "Storage unavailable; retry later", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["devices"],
    operation_id = "syncDevice"
)]
#[post("/devices/sync")]
pub async fn sync_device(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SyncRequest>,
) -> ApiResult<web::Json<SyncResponse>> {
    let request = DeviceSyncRequest {
        context: session.sync_context(),
        batch: SyncBatch::from(payload.into_inner()),
    };
    let outcome = state.sync.sync(request).await?;
    Ok(web::Json(SyncResponse::from(outcome)))
}
