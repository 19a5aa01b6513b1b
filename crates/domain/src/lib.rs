pub mod config;
pub mod dnssec;
pub mod errors;
pub mod event;
pub mod query;
pub mod query_type;
pub mod reply;
pub mod session;
pub mod status;

pub use config::{CliOverrides, Config};
pub use dnssec::DnssecStatus;
pub use errors::DomainError;
pub use event::{DnsEvent, ExternalBlockKind, QueryStart};
pub use query::{QueryFlags, QueryRecord, QueryRow, StringId};
pub use query_type::QueryType;
pub use reply::ReplyType;
pub use session::Session;
pub use status::QueryStatus;
