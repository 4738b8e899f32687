//! Repository layer for data access

pub mod dns_records;
pub mod domains;
pub mod emails;
pub mod links;

// Re-export concrete repository implementations with simple names
pub use dns_records::DbDnsRecordRepository as DnsRecordRepository;
pub use domains::DbDomainRepository as DomainRepository;
pub use emails::DbEmailRepository as EmailRepository;
pub use links::DbLinkRepository as LinkRepository;

// Re-export repository traits
pub use dns_records::DnsRecordRepository as DnsRecordRepositoryTrait;
pub use domains::DomainRepository as DomainRepositoryTrait;
pub use emails::EmailRepository as EmailRepositoryTrait;
pub use links::LinkRepository as LinkRepositoryTrait;

use zonegate_common::Error;

/// Map a sqlx error from an INSERT, turning unique violations into
/// conflicts the API layer reports as 409
pub(crate) fn map_insert_err(e: sqlx::Error, what: &str) -> Error {
    if e.as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false)
    {
        Error::Conflict(format!("{} already exists", what))
    } else {
        Error::Database(e.to_string())
    }
}
