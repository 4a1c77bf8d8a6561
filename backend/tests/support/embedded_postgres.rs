//! Embedded PostgreSQL helpers shared by the database suites.
//!
//! - Each test gets a fresh database cloned from a template that already has
//!   the embedded Diesel migrations applied.
//! - Assertions and fault injection go through the synchronous `postgres`
//!   client so they never share a connection with the store under test.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::MigrationHarness;
use fleet_backend::outbound::persistence::MIGRATIONS;
use pg_embedded_setup_unpriv::test_support::hash_directory;
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::types::FromSqlOwned;
use postgres::{Client, NoTls};
use uuid::Uuid;

use super::format_postgres_error;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "fleet_template";
const PROVISION_ATTEMPTS: usize = 5;
const PROVISION_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Failure while preparing or inspecting a test database.
#[derive(Debug, thiserror::Error)]
pub enum TestDbError {
    /// Could not connect.
    #[error("connect: {0}")]
    Connect(String),
    /// A statement or cluster operation failed.
    #[error("{0}")]
    Query(String),
}

fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

/// Template name derived from the migrations hash, so schema edits get a
/// fresh template.
fn template_database_name() -> Result<String, TestDbError> {
    let hash = hash_directory(migrations_dir())
        .map_err(|err| TestDbError::Query(format!("hash migrations: {err}")))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

fn ensure_template_database(cluster: &ClusterHandle) -> Result<String, TestDbError> {
    let template_name = template_database_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(template_name.as_str())
        .map_err(|err| TestDbError::Query(format!("template check: {err:?}")))?;
    if !exists {
        cluster
            .create_database(template_name.as_str())
            .map_err(|err| TestDbError::Query(format!("create template: {err:?}")))?;
        let url = cluster.connection().database_url(&template_name);
        migrate_schema(&url)?;
    }
    Ok(template_name)
}

/// Provision a temporary database cloned from the migrated template.
///
/// Retries a few times; parallel suites occasionally race on template
/// creation.
pub fn provision_template_database(
    cluster: &ClusterHandle,
) -> Result<TemporaryDatabase, TestDbError> {
    let mut last_error = None;
    for attempt in 1..=PROVISION_ATTEMPTS {
        let outcome = ensure_template_database(cluster).and_then(|template| {
            let name = format!("test_{}", Uuid::new_v4().simple());
            cluster
                .temporary_database_from_template(name.as_str(), template.as_str())
                .map_err(|err| TestDbError::Query(format!("clone template: {err:?}")))
        });
        match outcome {
            Ok(database) => return Ok(database),
            Err(error) => {
                last_error = Some(TestDbError::Query(format!(
                    "attempt {attempt}/{PROVISION_ATTEMPTS}: {error}"
                )));
            }
        }
        if attempt < PROVISION_ATTEMPTS {
            std::thread::sleep(PROVISION_RETRY_DELAY);
        }
    }
    Err(last_error
        .unwrap_or_else(|| TestDbError::Query("clone template: exhausted retries".to_owned())))
}

/// Apply all pending embedded migrations to `url`.
pub fn migrate_schema(url: &str) -> Result<(), TestDbError> {
    let mut conn =
        PgConnection::establish(url).map_err(|err| TestDbError::Connect(format!("{err:?}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| TestDbError::Query(format!("migration: {err:?}")))?;
    Ok(())
}

fn connect(url: &str) -> Result<Client, TestDbError> {
    Client::connect(url, NoTls).map_err(|err| TestDbError::Connect(format_postgres_error(&err)))
}

/// Drop `table` and everything that references it.
pub fn drop_table(url: &str, table: &str) -> Result<(), TestDbError> {
    let mut client = connect(url)?;
    client
        .batch_execute(&format!("DROP TABLE IF EXISTS {table} CASCADE;"))
        .map_err(|err| TestDbError::Query(format_postgres_error(&err)))
}

/// First column of the single row returned by `sql`.
pub fn query_scalar<T: FromSqlOwned>(url: &str, sql: &str) -> Result<T, TestDbError> {
    let mut client = connect(url)?;
    let row = client
        .query_one(sql, &[])
        .map_err(|err| TestDbError::Query(format_postgres_error(&err)))?;
    row.try_get(0)
        .map_err(|err| TestDbError::Query(format_postgres_error(&err)))
}

/// Number of rows in `table` matching the optional `filter` clause.
pub fn count_rows(url: &str, table: &str, filter: Option<&str>) -> Result<i64, TestDbError> {
    let sql = match filter {
        Some(clause) => format!("SELECT COUNT(*) FROM {table} WHERE {clause}"),
        None => format!("SELECT COUNT(*) FROM {table}"),
    };
    query_scalar(url, &sql)
}
