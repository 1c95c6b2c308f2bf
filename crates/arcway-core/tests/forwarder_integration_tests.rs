//! End-to-end coverage of the Forwarder pipeline against a real upstream
//! (a second Actix Web server bound to an ephemeral port), exercising route
//! matching, transformers, circuit breaking, and auth stripping together
//! rather than any one component in isolation.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use arcway_core::breaker::CircuitBreakerRegistry;
use arcway_core::config::bootstrap::HttpClientSettings;
use arcway_core::config::store::{ConfigStore, InMemoryConfigStore};
use arcway_core::engine::TransformerEngine;
use arcway_core::events::EventBus;
use arcway_core::forwarder::Forwarder;
use arcway_core::logs::sink::LogSink;
use arcway_core::models::endpoint::{AuthType, Endpoint, Protocol};
use arcway_core::models::route::Route;
use arcway_core::models::transformer::{Transformer, TransformerType};
use arcway_core::processor::Processor;
use std::sync::Arc;

async fn echo_headers(req: HttpRequest) -> HttpResponse {
    let saw_auth = req.headers().contains_key("authorization");
    HttpResponse::Ok().json(serde_json::json!({"saw_auth": saw_auth}))
}

async fn echo_user(path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"id": path.into_inner()}))
}

async fn always_fails() -> HttpResponse {
    HttpResponse::InternalServerError().finish()
}

async fn spawn_upstream() -> String {
    let server = HttpServer::new(|| {
        App::new()
            .route("/echo-headers", web::get().to(echo_headers))
            .route("/users/{id}", web::get().to(echo_user))
            .route("/always-fails", web::get().to(always_fails))
    })
    .bind("127.0.0.1:0")
    .unwrap();
    let addr = server.addrs()[0];
    let running = server.run();
    actix_web::rt::spawn(running);
    format!("http://{addr}")
}

fn endpoint(id: &str, base_url: &str, use_circuit_breaker: bool) -> Endpoint {
    Endpoint {
        id: id.into(),
        name: id.into(),
        base_url: base_url.into(),
        protocol: Protocol::Http,
        auth_type: AuthType::None,
        auth_config: None,
        timeout_ms: 2_000,
        use_circuit_breaker,
        retry_count: 0,
        validate_ssl: true,
        log_requests: false,
        log_responses: false,
        disabled: false,
    }
}

fn forwarder_harness(
    config_store: Arc<dyn ConfigStore>,
    breakers: Arc<CircuitBreakerRegistry>,
    engine: Arc<TransformerEngine>,
    events: Arc<EventBus>,
    log_sink: Arc<LogSink>,
) -> Forwarder {
    Forwarder::new(
        config_store,
        breakers,
        Arc::new(Processor::new()),
        engine,
        events,
        log_sink,
        &HttpClientSettings::default(),
    )
    .unwrap()
}

#[actix_web::test]
async fn forwards_parameterized_get_and_substitutes_target_path() {
    let upstream = spawn_upstream().await;
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    store.upsert_endpoint(endpoint("up", &upstream, false)).unwrap();
    store
        .upsert_route(Route {
            id: "r1".into(),
            name: "r1".into(),
            endpoint_id: "up".into(),
            path_pattern: "/users/:id".into(),
            target_path: "/users/:id".into(),
            method: "GET".into(),
            input_transformer_id: None,
            output_transformer_id: None,
            cache_enabled: false,
            cache_ttl_seconds: None,
            rate_limit: None,
            strip_auth_header: false,
            disabled: false,
        })
        .unwrap();

    let forwarder = forwarder_harness(
        store,
        Arc::new(CircuitBreakerRegistry::new()),
        Arc::new(TransformerEngine::new()),
        Arc::new(EventBus::new()),
        Arc::new(LogSink::new(100)),
    );

    let response = forwarder
        .handle(
            &actix_web::http::Method::GET,
            "/users/42",
            &actix_web::http::header::HeaderMap::new(),
            Vec::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[actix_web::test]
async fn strips_auth_header_before_forwarding() {
    let upstream = spawn_upstream().await;
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    store.upsert_endpoint(endpoint("up", &upstream, false)).unwrap();
    store
        .upsert_route(Route {
            id: "r1".into(),
            name: "r1".into(),
            endpoint_id: "up".into(),
            path_pattern: "/echo-headers".into(),
            target_path: "/echo-headers".into(),
            method: "GET".into(),
            input_transformer_id: None,
            output_transformer_id: None,
            cache_enabled: false,
            cache_ttl_seconds: None,
            rate_limit: None,
            strip_auth_header: true,
            disabled: false,
        })
        .unwrap();

    let forwarder = forwarder_harness(
        store,
        Arc::new(CircuitBreakerRegistry::new()),
        Arc::new(TransformerEngine::new()),
        Arc::new(EventBus::new()),
        Arc::new(LogSink::new(100)),
    );

    let mut headers = actix_web::http::header::HeaderMap::new();
    headers.insert(
        actix_web::http::header::AUTHORIZATION,
        actix_web::http::header::HeaderValue::from_static("Bearer secret"),
    );

    let response = forwarder
        .handle(&actix_web::http::Method::GET, "/echo-headers", &headers, Vec::new(), None)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[actix_web::test]
async fn mapping_transformer_rewrites_response_body() {
    let upstream = spawn_upstream().await;
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    store.upsert_endpoint(endpoint("up", &upstream, false)).unwrap();

    let engine = Arc::new(TransformerEngine::new());
    let mapping_doc = serde_json::json!({
        "mappings": [
            {"source": "id", "target": "user_id"}
        ]
    })
    .to_string();
    engine
        .compile(&Transformer {
            id: "t1".into(),
            name: "t1".into(),
            kind: TransformerType::Mapping,
            content: mapping_doc,
            content_type: "application/json".into(),
            disabled: false,
        })
        .await
        .unwrap();

    store
        .upsert_route(Route {
            id: "r1".into(),
            name: "r1".into(),
            endpoint_id: "up".into(),
            path_pattern: "/users/:id".into(),
            target_path: "/users/:id".into(),
            method: "GET".into(),
            input_transformer_id: None,
            output_transformer_id: Some("t1".into()),
            cache_enabled: false,
            cache_ttl_seconds: None,
            rate_limit: None,
            strip_auth_header: false,
            disabled: false,
        })
        .unwrap();

    let forwarder = forwarder_harness(
        store,
        Arc::new(CircuitBreakerRegistry::new()),
        engine,
        Arc::new(EventBus::new()),
        Arc::new(LogSink::new(100)),
    );

    let response = forwarder
        .handle(
            &actix_web::http::Method::GET,
            "/users/7",
            &actix_web::http::header::HeaderMap::new(),
            Vec::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["user_id"], "7");
    assert!(json.get("id").is_none());
}

#[actix_web::test]
async fn circuit_breaker_trips_after_repeated_failures() {
    let upstream = spawn_upstream().await;
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    store.upsert_endpoint(endpoint("up", &upstream, true)).unwrap();
    store
        .upsert_route(Route {
            id: "r1".into(),
            name: "r1".into(),
            endpoint_id: "up".into(),
            path_pattern: "/always-fails".into(),
            target_path: "/always-fails".into(),
            method: "GET".into(),
            input_transformer_id: None,
            output_transformer_id: None,
            cache_enabled: false,
            cache_ttl_seconds: None,
            rate_limit: None,
            strip_auth_header: false,
            disabled: false,
        })
        .unwrap();

    let forwarder = forwarder_harness(
        store,
        Arc::new(CircuitBreakerRegistry::new()),
        Arc::new(TransformerEngine::new()),
        Arc::new(EventBus::new()),
        Arc::new(LogSink::new(100)),
    );

    let mut saw_open = false;
    for _ in 0..10 {
        let response = forwarder
            .handle(
                &actix_web::http::Method::GET,
                "/always-fails",
                &actix_web::http::header::HeaderMap::new(),
                Vec::new(),
                None,
            )
            .await
            .unwrap();
        if response.status() == 503 {
            let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            if json["error"] == "circuit_open" {
                saw_open = true;
                break;
            }
        }
    }
    assert!(saw_open, "circuit breaker never reported open after repeated 500s");
}

#[actix_web::test]
async fn unmatched_path_surfaces_route_not_found() {
    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    let forwarder = forwarder_harness(
        store,
        Arc::new(CircuitBreakerRegistry::new()),
        Arc::new(TransformerEngine::new()),
        Arc::new(EventBus::new()),
        Arc::new(LogSink::new(100)),
    );

    let result = forwarder
        .handle(
            &actix_web::http::Method::GET,
            "/nope",
            &actix_web::http::header::HeaderMap::new(),
            Vec::new(),
            None,
        )
        .await;
    assert!(result.is_err());
}
