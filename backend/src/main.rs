//! Backend entry-point: loads settings, prepares the database and serves the
//! device sync API.

mod server;

use std::path::Path;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use fleet_backend::inbound::http::health::HealthState;
use fleet_backend::outbound::persistence::{DbPool, run_pending_migrations_blocking};

use server::{ServerConfig, ServerSettings, create_server, load_session_key};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}

fn startup_error(context: &str, error: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {error}"))
}

async fn build_server_config(settings: &ServerSettings) -> std::io::Result<ServerConfig> {
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| startup_error("invalid settings", e))?;
    let pool_config = settings
        .pool_config()
        .map_err(|e| startup_error("invalid settings", e))?;
    let policy = settings
        .sync_policy()
        .map_err(|e| startup_error("invalid settings", e))?;
    let json_limit = settings
        .json_limit_bytes()
        .map_err(|e| startup_error("invalid settings", e))?;
    let allow_ephemeral = settings
        .allow_ephemeral_key(cfg!(debug_assertions))
        .map_err(|e| startup_error("invalid settings", e))?;

    let key = load_session_key(
        Path::new(settings.session_key_file()),
        allow_ephemeral,
        !cfg!(debug_assertions),
    )
    .map_err(|e| startup_error("session key", e))?;

    if settings.run_migrations {
        let url = pool_config.database_url().to_owned();
        let applied = run_pending_migrations_blocking(url)
            .await
            .map_err(|e| startup_error("migrations", e))?;
        info!(applied, "database schema up to date");
    } else {
        info!(reason = "disabled", "migrations skipped");
    }

    info!(?pool_config, "connecting database pool");
    let pool = DbPool::new(pool_config)
        .await
        .map_err(|e| startup_error("database pool", e))?;

    let config = ServerConfig::new(key, bind_addr, pool)
        .with_cookie_secure(settings.cookie_secure)
        .with_sync_policy(policy)
        .with_json_limit_bytes(json_limit);

    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(server::make_metrics()?));

    Ok(config)
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let settings = ServerSettings::load().map_err(|e| startup_error("failed to load settings", e))?;
    let config = build_server_config(&settings).await?;

    let health_state = web::Data::new(HealthState::new());
    info!(bind_addr = %config.bind_addr, "starting device sync server");
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    info!("server stopped");
    outcome
}
