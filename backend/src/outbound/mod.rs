//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed sync store using Diesel ORM
//! - **metrics**: Prometheus-backed sync metrics (feature-gated)
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
