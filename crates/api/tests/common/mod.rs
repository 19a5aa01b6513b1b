use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use vigil_dns_api::auth::{SessionTable, Sha256Verifier};
use vigil_dns_api::state::{AppState, QueryApi, StatsApi};
use vigil_dns_api::create_api_router;
use vigil_dns_application::use_cases::{
    GetHistoryUseCase, GetQueryLogUseCase, GetStatsUseCase, GetSuggestionsUseCase,
};
use vigil_dns_application::Core;
use vigil_dns_domain::Config;
use vigil_dns_infrastructure::database::{create_disk_pool, create_mem_pool};
use vigil_dns_infrastructure::repositories::SqliteQueryHistory;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub core: Arc<Core>,
    pub history: Arc<SqliteQueryHistory>,
    pub db_path: String,
}

pub async fn make_app(tag: &str, mutate: impl FnOnce(&mut Config)) -> TestApp {
    let db_path = std::env::temp_dir()
        .join(format!("vigil-dns-api-{}-{}.db", std::process::id(), tag))
        .to_string_lossy()
        .into_owned();
    let _ = std::fs::remove_file(&db_path);

    let mut config = Config::default();
    config.database.path = db_path.clone();
    // Loopback bypass off by default so auth paths are actually exercised
    config.api.local_api_auth = true;
    mutate(&mut config);

    let config = Arc::new(ArcSwap::from_pointee(config));
    let core = Arc::new(Core::new(config.clone(), now()));

    let mem = create_mem_pool().await.unwrap();
    let disk = create_disk_pool(&config.load().database).await.unwrap();
    let history = Arc::new(SqliteQueryHistory::new(mem, disk, db_path.clone()));

    let sessions = Arc::new(SessionTable::new(config.load().api.max_sessions));
    let verifier = Arc::new(Sha256Verifier::new(config.clone()));

    let state = AppState {
        core: core.clone(),
        sessions,
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
        config_path: None,
    };

    TestApp {
        router: create_api_router(state.clone()),
        state,
        core,
        history,
        db_path,
    }
}

pub fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub const CLIENT_ADDR: &str = "192.168.1.50";

pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    let addr: SocketAddr = format!("{CLIENT_ADDR}:34567").parse().unwrap();
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(addr))
}

pub fn json_body(value: Value) -> Body {
    Body::from(value.to_string())
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}
