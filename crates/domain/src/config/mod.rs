mod api;
mod database;
mod dns;
mod files;
mod logging;
mod misc;
mod root;
mod server;

pub use api::{ApiConfig, PrivacyLevel};
pub use database::DatabaseConfig;
pub use dns::{BusyReply, DnsConfig, RateLimitConfig};
pub use files::FilesConfig;
pub use logging::LoggingConfig;
pub use misc::{CheckConfig, MiscConfig};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
