mod flush_query_log;
mod get_query_log;
mod get_stats;
mod get_suggestions;
mod run_gc;

pub use flush_query_log::FlushQueryLogUseCase;
pub use get_query_log::GetQueryLogUseCase;
pub use get_stats::{GetHistoryUseCase, GetStatsUseCase};
pub use get_suggestions::GetSuggestionsUseCase;
pub use run_gc::{GcOutcome, RunGarbageCollectionUseCase, GC_INTERVAL_SECS};
