//! HTTP surface tests
//!
//! Drives the exact router the binary serves with `tower::ServiceExt`,
//! over a runtime wired with the fallback embedder and a seeded registry.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use capdex_domain::entities::service::{
    Capability, IntegrationDetails, Service, ServiceKind, ServiceStatus, Visibility,
};
use capdex_domain::entities::{ApiKey, Tool, User};
use capdex_infrastructure::auth::{hash_api_key, Claims};
use capdex_infrastructure::bootstrap::build_runtime;
use capdex_infrastructure::config::AppConfig;
use capdex_infrastructure::registry::RegistryStore;
use capdex_providers::events::RegistryEventBus;
use capdex_server::{app, AppState};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;

const JWT_SECRET: &str = "api-test-secret";
const API_KEY: &str = "sk-api-test";

fn seeded_registry() -> Arc<RegistryStore> {
    let registry = Arc::new(RegistryStore::new(RegistryEventBus::new()));

    let mut shoes = Service {
        id: 1,
        name: "ShoesAgent".into(),
        description: "footwear shopping assistant to buy shoes".into(),
        kind: ServiceKind::InternalAgent,
        status: ServiceStatus::Active,
        visibility: Visibility::Internal,
        version: "1.0".into(),
        endpoint: "https://shoes.internal".into(),
        capabilities: vec![Capability {
            name: "product_search".into(),
            description: "find footwear products".into(),
        }],
        domains: vec!["retail".into()],
        interaction_modes: vec![],
        policy_ids: vec![],
        deprecated_at: None,
        deprecation_notice: None,
        timeout_ms: None,
        retry_policy: None,
        success_criteria: None,
    };
    registry.upsert_service(shoes.clone());
    registry.set_integration(
        1,
        IntegrationDetails {
            access_protocol: "http".into(),
            base_endpoint: "https://shoes.internal/api".into(),
            auth_method: "api_key".into(),
            auth_config: HashMap::new(),
            rate_limit_hints: HashMap::new(),
            esb_routing: None,
            health_endpoint: None,
        },
    );
    registry.upsert_tool(Tool {
        id: 10,
        service_id: 1,
        name: "product_search".into(),
        description: "search for shoes you want to buy in the footwear catalog".into(),
        input_schema: Some(json!({"type": "object"})),
        output_schema: None,
        example_calls: None,
        endpoint_pattern: Some("/products/search".into()),
        is_active: true,
        tool_version: None,
    });

    shoes.id = 2;
    shoes.name = "BootsOutlet".into();
    shoes.description = "discount boots and footwear outlet".into();
    shoes.capabilities = vec![];
    registry.upsert_service(shoes);
    registry.upsert_tool(Tool {
        id: 20,
        service_id: 2,
        name: "outlet_search".into(),
        description: "search discounted boots in the outlet".into(),
        input_schema: None,
        output_schema: None,
        example_calls: None,
        endpoint_pattern: None,
        is_active: true,
        tool_version: None,
    });

    registry.upsert_user(User {
        id: 7,
        name: "dev".into(),
        roles: vec!["developer".into()],
        attributes: HashMap::new(),
        active: true,
    });
    registry.upsert_api_key(ApiKey {
        id: 1,
        name: "ci".into(),
        user_id: Some(7),
        key_hash: hash_api_key(API_KEY),
        scopes: vec![],
        rate_limit_per_minute: None,
        expires_at: None,
        active: true,
    });

    registry
}

async fn test_app() -> Router {
    let mut config = AppConfig::default();
    config.embedding.model = "fallback".into();
    config.embedding.dimension = 64;
    config.auth.jwt_secret = JWT_SECRET.into();
    let runtime = build_runtime(config, seeded_registry()).await.unwrap();
    app(AppState::from_runtime(&runtime))
}

fn bearer_token() -> String {
    let claims = Claims::new(7, vec![], vec![], "capdex".into(), 3600);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_credentials_get_401() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?query=shoes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHENTICATED");
    assert_eq!(body["error"], "unauthenticated");
    assert!(body["request_id"].as_str().is_some());
}

#[tokio::test]
async fn api_key_search_returns_results_and_rate_headers() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?query=shoes&limit=3")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-ratelimit-limit"));
    assert!(response.headers().contains_key("x-ratelimit-remaining"));
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    let body = body_json(response).await;
    assert_eq!(body["search_mode"], "tools_only");
    assert_eq!(body["metadata"]["search_backend"], "vector");
    assert_eq!(body["metadata"]["embedding_backend"], "fallback");
    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["rank"], 1);
}

#[tokio::test]
async fn api_key_is_accepted_as_query_parameter() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/search?query=shoes&api_key={API_KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bearer_token_works_for_post_search() {
    let app = test_app().await;
    let body = json!({
        "query": "i want to buy shoes",
        "limit": 3,
        "response_mode": "compact"
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/search")
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer_token()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty());
    // Compact drops schemas from tools
    assert!(results[0]["recommended_tool"]["input_schema"].is_null());
}

#[tokio::test]
async fn agents_only_is_rejected_with_422() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?query=shoes&search_mode=agents_only")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_SEARCH_MODE");
}

#[tokio::test]
async fn empty_query_is_rejected_with_400() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?query=")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn minimal_with_orchestration_carries_endpoint_only() {
    let app = test_app().await;
    let body = json!({
        "query": "buy shoes",
        "response_mode": "minimal",
        "include_orchestration": true
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/search")
                .header("x-api-key", API_KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    let with_integration = results
        .iter()
        .find(|r| !r["integration_details"].is_null())
        .expect("a result should carry integration details");
    assert!(with_integration["integration_details"]["base_endpoint"]
        .as_str()
        .is_some());
    assert!(with_integration["integration_details"]["auth_method"]
        .as_str()
        .is_some());
    if !with_integration["recommended_tool"].is_null() {
        assert!(with_integration["recommended_tool"]["input_schema"].is_null());
    }
}

#[tokio::test]
async fn feedback_roundtrip() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?query=shoes&limit=3")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    let search_id = body["metadata"]["search_id"].as_str().unwrap().to_string();
    let selected_id = body["results"][0]["recommended_tool"]["id"].as_i64().unwrap();

    let feedback = json!({
        "search_id": search_id,
        "position": 1,
        "selected_id": selected_id,
        "satisfaction": true
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/search/feedback")
                .header("x-api-key", API_KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(feedback.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "recorded");

    // Wrong id at that position is a validation error
    let bad = json!({
        "search_id": search_id,
        "position": 1,
        "selected_id": 999999
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/search/feedback")
                .header("x-api-key", API_KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(bad.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_reports_the_subsystem() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search/status")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["services_index_size"], 2);
    assert_eq!(body["tools_index_size"], 2);
    assert_eq!(body["embedding_backend"], "fallback");
    assert_eq!(body["index_stale"], false);
}

#[tokio::test]
async fn similar_services_endpoint() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/search/similar/1?limit=5")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service_id"], 1);
    let results = body["results"].as_array().unwrap();
    assert!(results.iter().all(|r| r["service"]["id"] != 1));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search/similar/999")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_is_open_and_reports_components() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    let names: Vec<&str> = body["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    for expected in ["api", "registry", "services_index", "tools_index", "cache"] {
        assert!(names.contains(&expected), "missing component {expected}");
    }
}

#[tokio::test]
async fn rate_limit_exhaustion_returns_429_with_retry_after() {
    let mut config = AppConfig::default();
    config.embedding.model = "fallback".into();
    config.embedding.dimension = 64;
    config.auth.jwt_secret = JWT_SECRET.into();
    config.limits.rate_limit_default_per_minute = 1;
    config.limits.rate_limit_burst = 0;
    let runtime = build_runtime(config, seeded_registry()).await.unwrap();
    let app = app(AppState::from_runtime(&runtime));

    let ok = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?query=shoes")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let limited = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/search?query=shoes")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key(header::RETRY_AFTER));
    let body = body_json(limited).await;
    assert_eq!(body["code"], "RATE_LIMITED");
}
