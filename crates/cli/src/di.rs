use arc_swap::ArcSwap;
use std::sync::Arc;
use vigil_dns_api::auth::{SessionTable, Sha256Verifier};
use vigil_dns_api::state::{AppState, QueryApi, StatsApi};
use vigil_dns_application::use_cases::{
    FlushQueryLogUseCase, GetHistoryUseCase, GetQueryLogUseCase, GetStatsUseCase,
    GetSuggestionsUseCase, RunGarbageCollectionUseCase,
};
use vigil_dns_application::Core;
use vigil_dns_domain::Config;
use vigil_dns_infrastructure::database::{create_disk_pool, create_mem_pool};
use vigil_dns_infrastructure::repositories::{SqliteQueryHistory, SqliteSessionStore};

/// Everything the daemon wires together at startup.
pub struct Wiring {
    pub core: Arc<Core>,
    pub history: Arc<SqliteQueryHistory>,
    pub session_store: Arc<SqliteSessionStore>,
    pub sessions: Arc<SessionTable>,
    pub flush: Arc<FlushQueryLogUseCase>,
    pub gc: Arc<RunGarbageCollectionUseCase>,
    pub state: AppState,
}

pub async fn build(
    config: Arc<ArcSwap<Config>>,
    config_path: Option<&str>,
    now: i64,
) -> anyhow::Result<Wiring> {
    let core = Arc::new(Core::new(config.clone(), now));

    let cfg = config.load_full();
    let mem = create_mem_pool().await?;
    let disk = create_disk_pool(&cfg.database).await?;
    let history = Arc::new(SqliteQueryHistory::new(
        mem,
        disk.clone(),
        cfg.database.path.clone(),
    ));
    let session_store = Arc::new(SqliteSessionStore::new(disk));

    let sessions = Arc::new(SessionTable::new(cfg.api.max_sessions));
    let verifier = Arc::new(Sha256Verifier::new(config.clone()));

    let flush = Arc::new(FlushQueryLogUseCase::new(core.clone(), history.clone()));
    let gc = Arc::new(RunGarbageCollectionUseCase::new(
        core.clone(),
        history.clone(),
        config.clone(),
    ));

    let state = AppState {
        core: core.clone(),
        sessions: sessions.clone(),
        verifier,
        query: QueryApi {
            get_log: Arc::new(GetQueryLogUseCase::new(history.clone(), config.clone())),
            get_suggestions: Arc::new(GetSuggestionsUseCase::new(history.clone())),
        },
        stats: StatsApi {
            get_stats: Arc::new(GetStatsUseCase::new(core.clone())),
            get_history: Arc::new(GetHistoryUseCase::new(core.clone())),
        },
        config: config.clone(),
        config_path: config_path.map(Arc::from),
    };

    Ok(Wiring {
        core,
        history,
        session_store,
        sessions,
        flush,
        gc,
        state,
    })
}
