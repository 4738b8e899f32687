//! Zonegate Core - edge gateway and background services
//!
//! This crate provides the wildcard gateway that routes subdomain traffic
//! by DNS record, the proxy surfaces (GitHub, file, Docker registry), the
//! upstream DNS mirror client, and the expiry cleanup worker.

pub mod cleanup;
pub mod gateway;
pub mod mirror;
pub mod ratelimit;

pub use cleanup::CleanupWorker;
pub use gateway::{classifier::RouteTarget, GatewayState};
pub use mirror::{MirrorClient, MirrorUpsert};
pub use ratelimit::{client_ip, FixedWindowLimiter, RateLimiter};
