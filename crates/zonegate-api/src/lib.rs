//! Zonegate API - backend REST service
//!
//! This crate provides the HTTP API behind the gateway: mailbox access,
//! the zone directory, short links, and DNS record management. Every
//! response is JSON with a `success` flag; errors carry a stable `code`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use openapi::create_openapi_routes;
pub use routes::create_router;
