//! Zonegate Web - HTML pages rendered by the gateway
//!
//! The gateway serves a handful of self-contained pages: the API docs,
//! landing/error pages for zone subdomains, and short link error pages.
//! All markup lives in compiled-in minijinja templates with inline CSS,
//! so no static asset route is needed.

pub mod pages;
pub mod templates;

pub use pages::{Pages, RecordRow};
pub use templates::Templates;
