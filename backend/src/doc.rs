//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: the device sync endpoint and the health probes
//! - **Schemas**: the sync wire types plus domain type wrappers
//!   ([`ErrorSchema`], [`ErrorCodeSchema`]) that provide OpenAPI definitions
//!   without coupling domain types to the utoipa framework
//! - **Security**: optional session cookie issued by the authentication
//!   service
//!
//! The generated document is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::sync_dto::{
    DeviceDto, DocumentDto, DocumentHeaderDto, DocumentLineDto, SyncRequest, SyncResponse,
    SyncStatsResponse,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by the authentication service. Optional: \
                 pushes without it are attributed to the device-sync account.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Fleet device sync API",
        description = "Ingestion endpoint for sales and orders pushed by field devices, plus health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security((), ("SessionCookie" = [])),
    paths(
        crate::inbound::http::sync::sync_device,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        SyncRequest,
        SyncResponse,
        SyncStatsResponse,
        DeviceDto,
        DocumentDto,
        DocumentHeaderDto,
        DocumentLineDto,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "devices", description = "Device batch ingestion"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
