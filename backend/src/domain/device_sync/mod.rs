//! Device sync coordinator.
//!
//! One batch moves through `validate → transaction → resolve device →
//! ownership check → location → documents → commit`. Validation happens
//! before any storage access; everything after it runs inside a single
//! [`SyncStore`](crate::domain::ports::SyncStore) transaction so a batch
//! either lands completely or not at all.

mod apply;
mod ownership;
mod plan;
mod policy;
mod registry;
mod service;

pub use ownership::OWNER_CONFLICT_CODE;
pub use policy::{DEFAULT_MAX_DOCUMENTS_PER_BATCH, DEFAULT_MAX_LINES_PER_DOCUMENT, SyncPolicy};
pub use service::DeviceSyncService;

#[cfg(test)]
mod tests;
