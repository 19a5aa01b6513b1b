use arc_swap::ArcSwap;
use std::sync::Arc;
use vigil_dns_application::ports::PasswordVerifier;
use vigil_dns_application::use_cases::{
    GetHistoryUseCase, GetQueryLogUseCase, GetStatsUseCase, GetSuggestionsUseCase,
};
use vigil_dns_application::Core;
use vigil_dns_domain::Config;

use crate::auth::SessionTable;

#[derive(Clone)]
pub struct QueryApi {
    pub get_log: Arc<GetQueryLogUseCase>,
    pub get_suggestions: Arc<GetSuggestionsUseCase>,
}

#[derive(Clone)]
pub struct StatsApi {
    pub get_stats: Arc<GetStatsUseCase>,
    pub get_history: Arc<GetHistoryUseCase>,
}

#[derive(Clone)]
pub struct AppState {
    pub core: Arc<Core>,
    pub sessions: Arc<SessionTable>,
    pub verifier: Arc<dyn PasswordVerifier>,
    pub query: QueryApi,
    pub stats: StatsApi,
    pub config: Arc<ArcSwap<Config>>,
    /// Path of the loaded config file; absent when running on defaults.
    pub config_path: Option<Arc<str>>,
}
