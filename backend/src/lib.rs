//! Fleet device sync backend.
//!
//! Field devices push batches of sales and orders together with their
//! current position; the backend registers the device, appends the location
//! and merges every document into PostgreSQL in one transaction.
//!
//! The crate follows a hexagonal layout: [`domain`] holds the coordinator and
//! its ports, [`inbound`] the Actix HTTP adapter and [`outbound`] the Diesel
//! store and optional Prometheus metrics.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
