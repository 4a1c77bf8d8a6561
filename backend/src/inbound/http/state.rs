//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::DeviceSyncCommand;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Device batch ingestion.
    pub sync: Arc<dyn DeviceSyncCommand>,
}

impl HttpState {
    /// Construct state from its ports.
    pub fn new(sync: Arc<dyn DeviceSyncCommand>) -> Self {
        Self { sync }
    }
}
