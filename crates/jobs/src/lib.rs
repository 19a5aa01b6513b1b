mod housekeeper;
mod query_flush;
mod runner;

pub use housekeeper::Housekeeper;
pub use query_flush::QueryFlushJob;
pub use runner::JobRunner;
