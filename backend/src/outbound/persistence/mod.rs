//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides the concrete implementation of the sync store port
//! backed by PostgreSQL via the Diesel ORM with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: the store only translates between Diesel rows and
//!   domain types. Ownership and skip rules live in the domain.
//! - **Internal models**: Diesel row structs (`models.rs`,
//!   `document_tables.rs`) and schema definitions (`schema.rs`) never leave
//!   this module.
//! - **Strongly typed errors**: all database errors map to
//!   `SyncStoreError`.
//!
//! # Example
//!
//! ```ignore
//! use fleet_backend::outbound::persistence::{DbPool, DieselSyncStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/fleet")).await?;
//! let store = DieselSyncStore::new(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_sync_store;
mod document_tables;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_sync_store::DieselSyncStore;
pub use migrations::{
    MIGRATIONS, MigrationError, run_pending_migrations, run_pending_migrations_blocking,
};
pub use pool::{DbPool, PoolConfig, PoolError};
