use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use vigil_dns_api::auth::{SessionTable, Sha256Verifier};
use vigil_dns_api::state::{AppState, QueryApi, StatsApi};
use vigil_dns_api::create_api_router;
use vigil_dns_application::ports::{QueryHistoryRepository, SessionStore};
use vigil_dns_application::use_cases::{
    FlushQueryLogUseCase, GetHistoryUseCase, GetQueryLogUseCase, GetStatsUseCase,
    GetSuggestionsUseCase, RunGarbageCollectionUseCase,
};
use vigil_dns_application::Core;
use vigil_dns_domain::{Config, DnsEvent, QueryStart, QueryStatus, QueryType};
use vigil_dns_infrastructure::database::{create_disk_pool, create_mem_pool};
use vigil_dns_infrastructure::ingest::parser::{parse_line, ParsedLine};
use vigil_dns_infrastructure::repositories::{SqliteQueryHistory, SqliteSessionStore};

struct World {
    core: Arc<Core>,
    history: Arc<SqliteQueryHistory>,
    session_store: Arc<SqliteSessionStore>,
    sessions: Arc<SessionTable>,
    flush: Arc<FlushQueryLogUseCase>,
    gc: Arc<RunGarbageCollectionUseCase>,
    config: Arc<ArcSwap<Config>>,
    router: axum::Router,
    db_path: String,
}

impl Drop for World {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

async fn make_world(tag: &str, mutate: impl FnOnce(&mut Config)) -> World {
    let db_path = std::env::temp_dir()
        .join(format!("vigil-dns-e2e-{}-{}.db", std::process::id(), tag))
        .to_string_lossy()
        .into_owned();
    let _ = std::fs::remove_file(&db_path);

    let mut config = Config::default();
    config.database.path = db_path.clone();
    config.api.local_api_auth = true;
    config.dns.rate_limit.count = 0;
    mutate(&mut config);

    let config = Arc::new(ArcSwap::from_pointee(config));
    let core = Arc::new(Core::new(config.clone(), now()));

    let mem = create_mem_pool().await.unwrap();
    let disk = create_disk_pool(&config.load().database).await.unwrap();
    let history = Arc::new(SqliteQueryHistory::new(mem, disk.clone(), db_path.clone()));
    let session_store = Arc::new(SqliteSessionStore::new(disk));

    let sessions = Arc::new(SessionTable::new(config.load().api.max_sessions));
    let flush = Arc::new(FlushQueryLogUseCase::new(core.clone(), history.clone()));
    let gc = Arc::new(RunGarbageCollectionUseCase::new(
        core.clone(),
        history.clone(),
        config.clone(),
    ));

    let state = AppState {
        core: core.clone(),
        sessions: sessions.clone(),
        verifier: Arc::new(Sha256Verifier::new(config.clone())),
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

    World {
        core,
        history,
        session_store,
        sessions,
        flush,
        gc,
        config,
        router: create_api_router(state),
        db_path,
    }
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    let addr: SocketAddr = "192.168.1.77:40000".parse().unwrap();
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(addr))
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Resolver log lines flow through the parser, the classifier, the mirror
/// flush and out of the HTTP query log.
#[tokio::test]
async fn log_lines_end_up_in_the_query_log_api() {
    let world = make_world("pipeline", |_| {}).await;

    let lines = [
        "Jul 30 13:05:23 dnsmasq[123]: query[A] shop.example from 10.0.0.1",
        "Jul 30 13:05:23 dnsmasq[123]: forwarded shop.example to 9.9.9.9#53",
        "Jul 30 13:05:23 dnsmasq[123]: reply shop.example is 93.184.216.34",
        "Jul 30 13:05:24 dnsmasq[123]: query[A] ads.example from 10.0.0.1",
        "Jul 30 13:05:24 dnsmasq[123]: gravity blocked ads.example is 0.0.0.0",
    ];

    // Drive the engine the way the tailer does, with a by-domain map
    let mut open = std::collections::HashMap::new();
    let base = now() as f64;
    for line in lines {
        let entry = parse_line(line, 2026).unwrap();
        match entry.line {
            ParsedLine::Query { qtype, domain, client } => {
                let (id, _) = world.core.admit(QueryStart {
                    timestamp: base,
                    qtype,
                    domain: domain.clone(),
                    client_ip: client,
                    client_name: None,
                });
                open.insert(domain, id);
            }
            ParsedLine::Forwarded { domain, upstream, port } => {
                world
                    .core
                    .apply(open[&domain], DnsEvent::Forwarded { upstream, port });
            }
            ParsedLine::Reply { domain, reply } => {
                world.core.apply(
                    open[&domain],
                    DnsEvent::Reply {
                        reply,
                        reply_time_ms: 4.2,
                        ttl: 300,
                    },
                );
            }
            ParsedLine::GravityBlocked { domain } => {
                world
                    .core
                    .apply(open[&domain], DnsEvent::Gravity { deep_cname: false });
            }
            other => panic!("unexpected line {other:?}"),
        }
    }

    world.flush.execute(false).await.unwrap();

    let response = world
        .router
        .clone()
        .oneshot(request("GET", "/queries").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let queries = body["queries"].as_array().unwrap();
    assert_eq!(queries.len(), 2);

    let blocked = queries.iter().find(|q| q["domain"] == "ads.example").unwrap();
    assert_eq!(blocked["status"], json!("GRAVITY"));
    let forwarded = queries.iter().find(|q| q["domain"] == "shop.example").unwrap();
    assert_eq!(forwarded["status"], json!("FORWARDED"));
    assert_eq!(forwarded["upstream"], json!("9.9.9.9#53"));
    assert_eq!(forwarded["reply"]["type"], json!("IP"));

    // Aggregates followed along
    assert_eq!(world.core.domain_counts("ads.example"), Some((1, 1)));
    let (_, blocked_sum) = world.core.overtime_sums();
    assert_eq!(blocked_sum, 1);
}

/// Spec scenario: fill the ring, advance past max_history, collect. Memory,
/// counters, overtime and the mem tier of the mirror all end up empty.
#[tokio::test]
async fn gc_empties_memory_and_mem_database() {
    let world = make_world("gc", |cfg| {
        cfg.api.max_history = 3600;
    })
    .await;

    let base = now() as f64;
    for i in 0..50 {
        let (id, _) = world.core.admit(QueryStart {
            timestamp: base + i as f64,
            qtype: QueryType::A,
            domain: format!("gc{i}.example"),
            client_ip: "10.0.0.5".to_string(),
            client_name: None,
        });
        if i % 5 == 0 {
            world.core.apply(id, DnsEvent::Gravity { deep_cname: false });
        }
    }
    world.flush.execute(false).await.unwrap();
    assert_eq!(world.history.counts().await.unwrap().mem_rows, 50);

    // Advance the clock past max_history plus two GC intervals
    let later = now() + 3600 + 1200;
    let outcome = world.gc.execute(later, false).await.unwrap();
    assert_eq!(outcome.removed, 50);

    let counters = world.core.counters();
    assert_eq!(counters.queries, 0);
    assert_eq!(counters.status_sum(), 0);
    assert_eq!(world.core.live_queries(), 0);
    assert_eq!(world.core.overtime_sums(), (0, 0));
    assert_eq!(world.history.counts().await.unwrap().mem_rows, 0);

    // The aged queries are no longer served; status would have been reset
    assert!(world.core.query(1).is_none());
    let fresh = world.core.counters();
    assert_eq!(fresh.status_count(QueryStatus::Gravity), 0);
}

/// Sessions persisted on shutdown come back on startup, minus expired ones.
#[tokio::test]
async fn sessions_survive_a_restart() {
    let world = make_world("restart", |cfg| {
        cfg.api.pwhash = vigil_dns_api::auth::credentials::hash_password("pw");
    })
    .await;

    let login = world
        .router
        .clone()
        .oneshot(
            request("POST", "/auth")
                .header("content-type", "application/json")
                .body(Body::from(json!({"password": "pw"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let sid = body_json(login).await["session"]["sid"]
        .as_str()
        .unwrap()
        .to_string();

    // Clean shutdown: persist the table
    world
        .session_store
        .backup(&world.sessions.snapshot())
        .await
        .unwrap();

    // "Restart": a fresh session table restored from the store
    let restored_table = SessionTable::new(world.config.load().api.max_sessions);
    let restored = restored_table.restore(world.session_store.restore().await.unwrap(), now());
    assert_eq!(restored, 1);

    let found = restored_table.check(&sid, "192.168.1.77", false, None, false, now(), 300);
    assert!(found.is_some(), "restored session must still authenticate");
}

/// Queries mirrored to disk remain readable through `disk=true` after the
/// mem tier has aged them out.
#[tokio::test]
async fn disk_history_serves_aged_out_queries() {
    let world = make_world("diskhist", |_| {}).await;

    let base = now() as f64;
    world.core.admit(QueryStart {
        timestamp: base,
        qtype: QueryType::HTTPS,
        domain: "old.example".to_string(),
        client_ip: "10.0.0.9".to_string(),
        client_name: None,
    });
    world.flush.execute(true).await.unwrap();
    world.history.delete_older_than_mem(base + 10.0).await.unwrap();

    let response = world
        .router
        .clone()
        .oneshot(request("GET", "/queries").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["queries"], json!([]));

    let response = world
        .router
        .clone()
        .oneshot(request("GET", "/queries?disk=true").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let queries = body["queries"].as_array().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["domain"], json!("old.example"));
    assert_eq!(queries[0]["type"], json!("HTTPS"));
}

/// Spec scenario: six rapid queries against count=5 leave the sixth refused
/// and the turnaround within one window.
#[tokio::test]
async fn rate_limited_client_is_refused() {
    let world = make_world("rate", |cfg| {
        cfg.dns.rate_limit.count = 5;
        cfg.dns.rate_limit.interval = 60;
    })
    .await;

    let base = now() as f64;
    let mut last = None;
    for i in 0..6 {
        let (_, verdict) = world.core.admit(QueryStart {
            timestamp: base + i as f64 * 0.1,
            qtype: QueryType::A,
            domain: "burst.example".to_string(),
            client_ip: "10.0.0.9".to_string(),
            client_name: None,
        });
        last = Some(verdict);
    }

    match last.unwrap() {
        vigil_dns_application::Verdict::Refuse { turnaround } => {
            assert!(turnaround > 0 && turnaround <= 60, "turnaround {turnaround}");
        }
        other => panic!("expected refusal, got {other:?}"),
    }
    let (_, _, limited) = world.core.client_counts("10.0.0.9").unwrap();
    assert!(limited);
}
