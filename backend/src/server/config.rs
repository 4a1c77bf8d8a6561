//! Runtime settings and the server configuration built from them.
//!
//! [`ServerSettings`] is what operators write (CLI flags, `FLEET_*`
//! environment variables, config files). [`ServerConfig`] is the validated
//! wiring handed to [`create_server`](super::create_server).

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};
use ortho_config::OrthoConfig;
use serde::Deserialize;

use fleet_backend::domain::{
    AccountLogin, CoordinateDefaults, DEFAULT_MAX_DOCUMENTS_PER_BATCH,
    DEFAULT_MAX_LINES_PER_DOCUMENT, SyncPolicy,
};
use fleet_backend::inbound::http::sync::DEFAULT_JSON_LIMIT_BYTES;
use fleet_backend::outbound::persistence::{DbPool, PoolConfig};

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_MIN_IDLE: u32 = 1;
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";

/// Errors raised while validating settings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    /// No database URL was configured.
    #[error("FLEET_DATABASE_URL is required")]
    MissingDatabaseUrl,
    /// The bind address does not parse.
    #[error("invalid bind address '{value}': {reason}")]
    InvalidBindAddr { value: String, reason: String },
    /// Pool sizing is inconsistent.
    #[error("db_min_idle ({min_idle}) must not exceed db_max_connections ({max})")]
    PoolSizing { min_idle: u32, max: u32 },
    /// A size limit was set to zero.
    #[error("{name} must be greater than zero")]
    ZeroLimit { name: &'static str },
    /// The fallback account login is blank.
    #[error("fallback_account_login must not be blank")]
    BlankFallbackLogin,
    /// Ephemeral session keys are refused in release builds.
    #[error("session_allow_ephemeral is only honoured in debug builds")]
    EphemeralNotAllowed,
}

/// Operator-facing settings for the sync backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FLEET")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub db_max_connections: Option<u32>,
    /// Minimum idle pooled connections.
    pub db_min_idle: Option<u32>,
    /// File holding the session cookie key material.
    pub session_key_file: Option<String>,
    /// Generate a throwaway session key when the file is unreadable.
    #[ortho_config(default = false)]
    pub session_allow_ephemeral: bool,
    /// Mark session cookies `Secure`.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// Maximum accepted sync body size.
    pub json_limit_bytes: Option<usize>,
    /// Login of the account that owns devices first seen anonymously.
    pub fallback_account_login: Option<String>,
    /// Store `0` rather than `NULL` for absent header coordinates.
    #[ortho_config(default = true)]
    pub legacy_coordinate_defaults: bool,
    /// Maximum sales plus orders in one batch.
    pub max_documents_per_batch: Option<usize>,
    /// Maximum lines in one document.
    pub max_lines_per_document: Option<usize>,
    /// Apply embedded migrations at startup.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

impl ServerSettings {
    /// Configured bind address, parsed.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|error: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                reason: error.to_string(),
            })
    }

    /// Database URL; required.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// Session key path, falling back to the mounted secret.
    pub fn session_key_file(&self) -> &str {
        self.session_key_file
            .as_deref()
            .unwrap_or(DEFAULT_SESSION_KEY_FILE)
    }

    /// Body limit for the sync route.
    pub fn json_limit_bytes(&self) -> Result<usize, SettingsError> {
        non_zero(
            self.json_limit_bytes.unwrap_or(DEFAULT_JSON_LIMIT_BYTES),
            "json_limit_bytes",
        )
    }

    /// Pool configuration after sizing validation.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let url = self.database_url()?;
        let max = self.db_max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let min_idle = self.db_min_idle.unwrap_or(DEFAULT_DB_MIN_IDLE);
        if max == 0 {
            return Err(SettingsError::ZeroLimit {
                name: "db_max_connections",
            });
        }
        if min_idle > max {
            return Err(SettingsError::PoolSizing { min_idle, max });
        }
        Ok(PoolConfig::new(url)
            .with_max_size(max)
            .with_min_idle(Some(min_idle)))
    }

    /// Domain policy for the sync coordinator.
    pub fn sync_policy(&self) -> Result<SyncPolicy, SettingsError> {
        let fallback = match self.fallback_account_login.as_deref() {
            Some(login) => {
                AccountLogin::new(login).map_err(|_| SettingsError::BlankFallbackLogin)?
            }
            None => AccountLogin::default_fallback(),
        };
        let coordinates = if self.legacy_coordinate_defaults {
            CoordinateDefaults::Zero
        } else {
            CoordinateDefaults::Null
        };
        let max_documents = non_zero(
            self.max_documents_per_batch
                .unwrap_or(DEFAULT_MAX_DOCUMENTS_PER_BATCH),
            "max_documents_per_batch",
        )?;
        let max_lines = non_zero(
            self.max_lines_per_document
                .unwrap_or(DEFAULT_MAX_LINES_PER_DOCUMENT),
            "max_lines_per_document",
        )?;
        Ok(SyncPolicy::default()
            .with_fallback_login(fallback)
            .with_coordinate_defaults(coordinates)
            .with_limits(max_documents, max_lines))
    }

    /// Whether an unreadable key file may be replaced by a generated key.
    ///
    /// Always allowed in debug builds; refused in release builds.
    pub fn allow_ephemeral_key(&self, debug_build: bool) -> Result<bool, SettingsError> {
        match (self.session_allow_ephemeral, debug_build) {
            (_, true) => Ok(true),
            (true, false) => Err(SettingsError::EphemeralNotAllowed),
            (false, false) => Ok(false),
        }
    }
}

fn non_zero(value: usize, name: &'static str) -> Result<usize, SettingsError> {
    if value == 0 {
        return Err(SettingsError::ZeroLimit { name });
    }
    Ok(value)
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) sync_policy: SyncPolicy,
    pub(crate) json_limit_bytes: usize,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration around a connection pool.
    #[must_use]
    pub fn new(key: Key, bind_addr: SocketAddr, db_pool: DbPool) -> Self {
        Self {
            key,
            cookie_secure: true,
            same_site: SameSite::Strict,
            bind_addr,
            db_pool,
            sync_policy: SyncPolicy::default(),
            json_limit_bytes: DEFAULT_JSON_LIMIT_BYTES,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Set the cookie `Secure` flag. Local HTTP testing is the only reason
    /// to clear it.
    #[must_use]
    pub fn with_cookie_secure(mut self, cookie_secure: bool) -> Self {
        self.cookie_secure = cookie_secure;
        self
    }

    /// Replace the coordinator policy.
    #[must_use]
    pub fn with_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.sync_policy = policy;
        self
    }

    /// Set the sync body limit.
    #[must_use]
    pub fn with_json_limit_bytes(mut self, limit: usize) -> Self {
        self.json_limit_bytes = limit;
        self
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
