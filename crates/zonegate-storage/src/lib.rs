//! Zonegate Storage - Database abstraction
//!
//! This crate provides the PostgreSQL-backed storage layer for Zonegate:
//! the connection pool, row models, and per-table repositories.

pub mod db;
pub mod models;
pub mod repository;

pub use db::{Database, DatabasePool};
pub use models::*;
pub use repository::*;
