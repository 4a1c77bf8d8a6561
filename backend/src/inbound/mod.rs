//! Inbound adapters that translate external requests into domain service
//! calls while keeping framework details at the edge.
//!
//! Devices reach the backend over HTTP only; handlers live under [`http`].

pub mod http;
