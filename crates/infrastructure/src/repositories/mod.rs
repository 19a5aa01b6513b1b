pub mod query_history;
pub mod session_repository;

pub use query_history::SqliteQueryHistory;
pub use session_repository::SqliteSessionStore;
