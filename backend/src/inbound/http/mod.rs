//! HTTP inbound adapter exposing REST endpoints.

pub mod error;
pub mod health;
pub mod lenient;
pub mod schemas;
pub mod session;
pub mod state;
pub mod sync;
pub mod sync_dto;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
