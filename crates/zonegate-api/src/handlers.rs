//! API request handlers

pub mod dns;
pub mod domains;
pub mod emails;
pub mod health;
pub mod links;

pub use dns::*;
pub use domains::*;
pub use emails::*;
pub use health::*;
pub use links::*;
