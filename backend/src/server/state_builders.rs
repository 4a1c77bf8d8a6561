//! Builders wiring driven adapters into the HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;

use fleet_backend::domain::DeviceSyncService;
use fleet_backend::domain::ports::{NoOpSyncMetrics, SyncMetrics};
use fleet_backend::inbound::http::state::HttpState;
use fleet_backend::outbound::persistence::DieselSyncStore;

use super::ServerConfig;

/// Select the sync metrics adapter.
///
/// Prometheus-backed when the feature is on and a registry is configured,
/// otherwise a no-op.
///
/// # Errors
/// Returns [`std::io::Error`] if metric registration fails.
#[cfg(feature = "metrics")]
fn build_sync_metrics(config: &ServerConfig) -> std::io::Result<Arc<dyn SyncMetrics>> {
    use fleet_backend::outbound::metrics::PrometheusSyncMetrics;

    match &config.prometheus {
        Some(prom) => {
            let metrics = PrometheusSyncMetrics::new(&prom.registry).map_err(|e| {
                std::io::Error::other(format!("sync metrics registration failed: {e}"))
            })?;
            Ok(Arc::new(metrics))
        }
        None => Ok(Arc::new(NoOpSyncMetrics)),
    }
}

#[cfg(not(feature = "metrics"))]
fn build_sync_metrics(_config: &ServerConfig) -> std::io::Result<Arc<dyn SyncMetrics>> {
    Ok(Arc::new(NoOpSyncMetrics))
}

/// Build the HTTP state around the Diesel sync store.
///
/// # Errors
/// Propagates metric registration failures.
pub fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let store = Arc::new(DieselSyncStore::new(config.db_pool.clone()));
    let service = DeviceSyncService::new(
        store,
        Arc::new(DefaultClock),
        config.sync_policy.clone(),
    )
    .with_metrics(build_sync_metrics(config)?);
    Ok(web::Data::new(HttpState::new(Arc::new(service))))
}
