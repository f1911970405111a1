//! Runtime wiring tests
//!
//! Exercises the bootstrap end to end with the fallback embedder: cold
//! start rebuild, snapshot persistence and restore, live invalidation
//! through the event bus, and gate admission over the wired registry.

use capdex_application::SearchRequest;
use capdex_domain::entities::service::{
    Capability, Service, ServiceKind, ServiceStatus, Visibility,
};
use capdex_domain::entities::{ApiKey, CallerIdentity, Tool, User};
use capdex_infrastructure::auth::hash_api_key;
use capdex_infrastructure::bootstrap::build_runtime;
use capdex_infrastructure::config::AppConfig;
use capdex_infrastructure::registry::RegistryStore;
use capdex_providers::events::RegistryEventBus;
use std::collections::HashMap;
use std::sync::Arc;

fn service(id: i64, name: &str, description: &str) -> Service {
    Service {
        id,
        name: name.into(),
        description: description.into(),
        kind: ServiceKind::Microservice,
        status: ServiceStatus::Active,
        visibility: Visibility::Internal,
        version: "1.0".into(),
        endpoint: format!("https://{}.internal", name.to_lowercase()),
        capabilities: vec![Capability {
            name: "main".into(),
            description: description.into(),
        }],
        domains: vec![],
        interaction_modes: vec![],
        policy_ids: vec![],
        deprecated_at: None,
        deprecation_notice: None,
        timeout_ms: None,
        retry_policy: None,
        success_criteria: None,
    }
}

fn tool(id: i64, service_id: i64, name: &str, description: &str) -> Tool {
    Tool {
        id,
        service_id,
        name: name.into(),
        description: description.into(),
        input_schema: None,
        output_schema: None,
        example_calls: None,
        endpoint_pattern: None,
        is_active: true,
        tool_version: None,
    }
}

fn seeded_registry() -> Arc<RegistryStore> {
    let registry = Arc::new(RegistryStore::new(RegistryEventBus::new()));
    registry.upsert_service(service(1, "WeatherService", "forecast the weather by city"));
    registry.upsert_tool(tool(10, 1, "get_forecast", "get the weather forecast for a city"));
    registry.upsert_service(service(2, "TicketDesk", "raise and track support tickets"));
    registry.upsert_tool(tool(20, 2, "raise_ticket", "raise a new support ticket"));
    registry.upsert_user(User {
        id: 7,
        name: "dev".into(),
        roles: vec![],
        attributes: HashMap::new(),
        active: true,
    });
    registry.upsert_api_key(ApiKey {
        id: 1,
        name: "ci".into(),
        user_id: Some(7),
        key_hash: hash_api_key("sk-test"),
        scopes: vec![],
        rate_limit_per_minute: None,
        expires_at: None,
        active: true,
    });
    registry
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.embedding.model = "fallback".into();
    config.embedding.dimension = 64;
    config.auth.jwt_secret = "test-secret".into();
    config
}

fn caller() -> CallerIdentity {
    CallerIdentity {
        user_id: Some(7),
        api_key_id: None,
        roles: vec![],
        attributes: HashMap::new(),
        scopes: vec![],
        rate_limit_per_minute: None,
    }
}

#[tokio::test]
async fn cold_start_rebuilds_and_serves() {
    let runtime = build_runtime(test_config(), seeded_registry()).await.unwrap();

    let report = runtime.search.status_report().await;
    assert_eq!(report.services_index_size, 2);
    assert_eq!(report.tools_index_size, 2);
    assert_eq!(report.embedding_backend, "fallback");

    let response = runtime
        .search
        .search(&caller(), &SearchRequest::with_query("weather forecast for a city"))
        .await
        .unwrap();
    assert_eq!(response.results[0].service.id, 1);
    assert_eq!(response.metadata.search_backend, "vector");
}

#[tokio::test]
async fn snapshots_persist_and_restore() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = test_config();
    config.index.dir = Some(dir.path().to_path_buf());

    // First runtime rebuilds from the registry and persists snapshots
    {
        let runtime = build_runtime(config.clone(), seeded_registry()).await.unwrap();
        assert_eq!(runtime.search.status_report().await.services_index_size, 2);
    }
    assert!(dir.path().join("services").join("meta.json").exists());
    assert!(dir.path().join("tools").join("vectors.bin").exists());

    // Second runtime restores from disk (same model and dimension)
    let runtime = build_runtime(config, seeded_registry()).await.unwrap();
    let report = runtime.search.status_report().await;
    assert_eq!(report.services_index_size, 2);
    assert_eq!(report.tools_index_size, 2);
}

#[tokio::test]
async fn live_mutations_flow_through_the_event_bus() {
    let registry = seeded_registry();
    let runtime = build_runtime(test_config(), registry.clone()).await.unwrap();

    registry.upsert_service(service(3, "MapService", "render street maps and routes"));
    registry.upsert_tool(tool(30, 3, "render_map", "render a street map for coordinates"));

    // The controller task drains the bus asynchronously; poll briefly
    let request = SearchRequest::with_query("render a street map for coordinates");
    let mut found = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let response = runtime.search.search(&caller(), &request).await.unwrap();
        if response.results.iter().any(|r| r.service.id == 3) {
            found = true;
            break;
        }
    }
    assert!(found, "new service never became searchable");
}

#[tokio::test]
async fn gate_admits_api_keys_and_enforces_quota() {
    let registry = seeded_registry();
    let mut config = test_config();
    config.limits.rate_limit_default_per_minute = 2;
    config.limits.rate_limit_burst = 0;
    let runtime = build_runtime(config, registry).await.unwrap();

    let caller = runtime.gate.authenticate(None, Some("sk-test")).unwrap();
    assert_eq!(caller.api_key_id, Some(1));

    assert!(runtime.gate.admit(&caller).is_ok());
    assert!(runtime.gate.admit(&caller).is_ok());
    assert!(runtime.gate.admit(&caller).is_err());
}
