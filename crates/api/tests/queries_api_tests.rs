use axum::body::Body;
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;
use vigil_dns_domain::config::PrivacyLevel;
use vigil_dns_domain::QueryRow;
use vigil_dns_application::ports::QueryHistoryRepository;

mod common;
use common::{body_json, make_app, request};

fn row(id: i64, ts: f64, domain: &str, status: i64) -> QueryRow {
    QueryRow {
        id,
        timestamp: ts,
        qtype: 0,
        status,
        domain: domain.to_string(),
        client: "10.0.0.1".to_string(),
        forward: None,
        additional_info: None,
        reply_type: 0,
        reply_time: 0.0,
        dnssec: 0,
        client_name: None,
        ttl: 0,
        regex_id: None,
    }
}

#[tokio::test]
async fn query_log_returns_denormalized_rows() {
    let app = make_app("qlog", |_| {}).await;
    app.history
        .store_queries(&[row(1, 1000.0, "one.example", 1), row(2, 1001.0, "two.example", 2)])
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/queries").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let queries = body["queries"].as_array().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["id"], json!(2));
    assert_eq!(queries[0]["status"], json!("FORWARDED"));
    assert_eq!(queries[0]["type"], json!("A"));
    assert_eq!(queries[1]["status"], json!("GRAVITY"));
    assert_eq!(queries[1]["domain"], json!("one.example"));
    assert_eq!(body["cursor"], json!(2));
    assert_eq!(body["recordsTotal"], json!(2));
    assert!(body["took"].is_number());
}

#[tokio::test]
async fn status_filter_accepts_canonical_forms_only() {
    let app = make_app("qfilter", |_| {}).await;
    app.history
        .store_queries(&[row(1, 1000.0, "a.example", 1), row(2, 1001.0, "b.example", 2)])
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            request("GET", "/queries?status=GRAVITY")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["queries"].as_array().unwrap().len(), 1);
    assert_eq!(body["queries"][0]["domain"], json!("a.example"));
    assert_eq!(body["recordsFiltered"], json!(1));

    // Lowercase works, the scan is case-insensitive
    let response = app
        .router
        .clone()
        .oneshot(
            request("GET", "/queries?status=gravity")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Unknown enum values are a client error
    let response = app
        .router
        .clone()
        .oneshot(
            request("GET", "/queries?status=NOT_A_STATUS")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["key"], json!("bad_request"));
    assert_eq!(body["error"]["hint"], json!("NOT_A_STATUS"));

    let response = app
        .router
        .clone()
        .oneshot(
            request("GET", "/queries?type=AXFR")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_cursor_is_a_client_error() {
    let app = make_app("qcursor", |_| {}).await;
    app.history
        .store_queries(&[row(1, 1000.0, "a.example", 0)])
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            request("GET", "/queries?cursor=999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], json!("Requested cursor is invalid"));
}

#[tokio::test]
async fn privacy_maximum_short_circuits() {
    let app = make_app("qprivacy", |cfg| {
        cfg.api.privacy_level = PrivacyLevel::Maximum;
    })
    .await;
    app.history
        .store_queries(&[row(1, 1000.0, "secret.example", 0)])
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/queries").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["queries"], json!([]));
    assert_eq!(body["cursor"], json!(null));
}

#[tokio::test]
async fn suggestions_include_enums_and_observed_values() {
    let app = make_app("qsuggest", |_| {}).await;
    let mut r = row(1, 1000.0, "sug.example", 0);
    r.forward = Some("9.9.9.9#53".to_string());
    app.history.store_queries(&[r]).await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            request("GET", "/queries/suggestions?count=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let s = &body["suggestions"];
    assert_eq!(s["domain"], json!(["sug.example"]));
    assert_eq!(s["upstream"], json!(["9.9.9.9#53"]));
    assert!(s["type"].as_array().unwrap().iter().any(|v| v == "AAAA"));
    assert!(s["status"].as_array().unwrap().iter().any(|v| v == "GRAVITY_CNAME"));
    assert!(s["reply"].as_array().unwrap().iter().any(|v| v == "NXDOMAIN"));
    assert!(s["dnssec"].as_array().unwrap().iter().any(|v| v == "BOGUS"));
}

#[tokio::test]
async fn stats_summary_reflects_engine_counters() {
    let app = make_app("qstats", |_| {}).await;
    use vigil_dns_domain::{DnsEvent, QueryStart, QueryType};

    let now = common::now() as f64;
    for i in 0..4 {
        let (id, _) = app.core.admit(QueryStart {
            timestamp: now + i as f64,
            qtype: QueryType::A,
            domain: format!("d{i}.example"),
            client_ip: "10.0.0.1".to_string(),
            client_name: None,
        });
        if i % 2 == 0 {
            app.core.apply(id, DnsEvent::Gravity { deep_cname: false });
        }
    }

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/stats/summary").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["queries"]["total"], json!(4));
    assert_eq!(body["queries"]["blocked"], json!(2));
    assert_eq!(body["queries"]["percent_blocked"], json!(50.0));
    assert_eq!(body["queries"]["unique_domains"], json!(4));
    assert_eq!(body["clients"]["active"], json!(1));
    assert_eq!(body["queries"]["status"]["GRAVITY"], json!(2));

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    let history = body["history"].as_array().unwrap();
    let total: i64 = history.iter().map(|h| h["total"].as_i64().unwrap()).sum();
    let blocked: i64 = history.iter().map(|h| h["blocked"].as_i64().unwrap()).sum();
    assert_eq!(total, 4);
    assert_eq!(blocked, 2);
}

#[tokio::test]
async fn config_get_and_patch() {
    let app = make_app("qconfig", |_| {}).await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/config").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["config"]["dns"]["rate_limit"]["count"], json!(1000));

    // Hot-swappable key
    let response = app
        .router
        .clone()
        .oneshot(
            request("PATCH", "/config")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"config": {"dns": {"rate_limit": {"count": 42}}}}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.state.config.load().dns.rate_limit.count, 42);

    // Restart-flagged key is rejected
    let response = app
        .router
        .clone()
        .oneshot(
            request("PATCH", "/config")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"config": {"server": {"port": 9999}}}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["hint"], json!("config_restart_required"));
}
