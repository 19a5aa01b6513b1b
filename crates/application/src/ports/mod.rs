mod password;
mod query_history;
mod session_store;
mod system_probe;

pub use password::{PasswordResult, PasswordVerifier};
pub use query_history::{
    DbCounts, QueryHistoryRepository, QueryLogFilters, QueryLogPage, SuggestionLists,
};
pub use session_store::SessionStore;
pub use system_probe::SystemProbe;
